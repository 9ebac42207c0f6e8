//! CSV import of applications.
//!
//! Headers are matched case-insensitively against a list of aliases, with
//! underscores, dashes and repeated spaces treated as a single space. Bad
//! rows are reported with their line number and never abort the file.

use std::collections::HashMap;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::applications::{parse_amount, NewApplication};
use crate::errors::{Error, Result};
use crate::status::CollectionStatus;
use crate::utils::Period;

/// Application fields an import column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ImportField {
    ApplicantId,
    ApplicantName,
    Branch,
    TeamLead,
    Rm,
    CollectionRm,
    Dealer,
    Lender,
    Repayment,
    Mobile,
    EmiAmount,
    PrincipalDue,
    InterestDue,
    LastMonthBounce,
    DemandDate,
    LmsStatus,
}

const HEADER_ALIASES: &[(ImportField, &[&str])] = &[
    (
        ImportField::ApplicantId,
        &["applicant id", "application id", "app id", "loan id"],
    ),
    (
        ImportField::ApplicantName,
        &["applicant name", "name", "customer name", "borrower name"],
    ),
    (ImportField::Branch, &["branch", "branch name"]),
    (ImportField::TeamLead, &["team lead", "tl", "team lead name"]),
    (ImportField::Rm, &["rm", "rm name", "relationship manager"]),
    (ImportField::CollectionRm, &["collection rm", "collection rm name"]),
    (ImportField::Dealer, &["dealer", "dealer name"]),
    (ImportField::Lender, &["lender", "lender name"]),
    (
        ImportField::Repayment,
        &["repayment", "repayment no", "repayment number", "emi no"],
    ),
    (
        ImportField::Mobile,
        &["mobile", "mobile number", "applicant mobile", "phone"],
    ),
    (ImportField::EmiAmount, &["emi", "emi amount"]),
    (ImportField::PrincipalDue, &["principal due", "principal"]),
    (ImportField::InterestDue, &["interest due", "interest"]),
    (ImportField::LastMonthBounce, &["last month bounce", "bounce"]),
    (
        ImportField::DemandDate,
        &["demand date", "demand month", "period"],
    ),
    (ImportField::LmsStatus, &["lms status", "status"]),
];

/// A row that could not be turned into an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRowError {
    /// 1-based line number in the file, header included.
    pub line: u64,
    pub column: Option<String>,
    pub message: String,
}

/// Parsed records plus the rows that were rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub records: Vec<NewApplication>,
    pub errors: Vec<ImportRowError>,
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_for_header(header: &str) -> Option<ImportField> {
    let normalized = normalize_header(header);
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(field, _)| *field)
}

/// Parses an application CSV. Rows without a `demand_date` column value
/// fall back to `default_period`.
///
/// Fails only when the header row is unreadable or lacks the applicant id
/// or name columns.
pub fn parse_applications_csv<R: Read>(reader: R, default_period: Period) -> Result<ImportOutcome> {
    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut columns: HashMap<ImportField, usize> = HashMap::new();
    for (index, header) in headers.iter().enumerate() {
        match field_for_header(header) {
            Some(field) => {
                columns.entry(field).or_insert(index);
            }
            None => debug!("Ignoring unknown import column '{}'", header),
        }
    }
    for (field, label) in [
        (ImportField::ApplicantId, "applicant id"),
        (ImportField::ApplicantName, "applicant name"),
    ] {
        if !columns.contains_key(&field) {
            return Err(Error::Import(format!("missing required column '{}'", label)));
        }
    }

    let mut outcome = ImportOutcome::default();
    for (index, result) in csv_reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                outcome.errors.push(ImportRowError {
                    line: fallback_line,
                    column: None,
                    message: e.to_string(),
                });
                continue;
            }
        };
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_line);

        match parse_record(&record, &columns, default_period) {
            Ok(application) => outcome.records.push(application),
            Err((column, message)) => outcome.errors.push(ImportRowError {
                line,
                column: column.map(str::to_string),
                message,
            }),
        }
    }

    info!(
        "Parsed {} application(s) with {} rejected row(s)",
        outcome.records.len(),
        outcome.errors.len()
    );
    Ok(outcome)
}

type RowError = (Option<&'static str>, String);

fn parse_record(
    record: &StringRecord,
    columns: &HashMap<ImportField, usize>,
    default_period: Period,
) -> std::result::Result<NewApplication, RowError> {
    let text = |field: ImportField| -> Option<String> {
        columns
            .get(&field)
            .and_then(|index| record.get(*index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let amount = |field: ImportField, label: &'static str| {
        text(field)
            .map(|value| parse_amount(&value).map_err(|e| (Some(label), e.to_string())))
            .transpose()
    };

    let applicant_id = text(ImportField::ApplicantId)
        .ok_or((Some("applicant id"), "applicant id is required".to_string()))?;
    let applicant_name = text(ImportField::ApplicantName)
        .ok_or((Some("applicant name"), "applicant name is required".to_string()))?;
    let demand_date = match text(ImportField::DemandDate) {
        Some(value) => value
            .parse::<Period>()
            .map_err(|e| (Some("demand date"), e.to_string()))?,
        None => default_period,
    };

    let mut application = NewApplication::new(&applicant_id, &applicant_name, demand_date);
    application.branch_name = text(ImportField::Branch);
    application.team_lead = text(ImportField::TeamLead);
    application.rm_name = text(ImportField::Rm);
    application.collection_rm = text(ImportField::CollectionRm);
    application.dealer_name = text(ImportField::Dealer);
    application.lender_name = text(ImportField::Lender);
    application.repayment = text(ImportField::Repayment);
    application.applicant_mobile = text(ImportField::Mobile);
    application.emi_amount = amount(ImportField::EmiAmount, "emi amount")?;
    application.principal_due = amount(ImportField::PrincipalDue, "principal due")?;
    application.interest_due = amount(ImportField::InterestDue, "interest due")?;
    application.last_month_bounce = text(ImportField::LastMonthBounce)
        .map(|value| {
            value.parse::<i64>().map_err(|_| {
                (
                    Some("last month bounce"),
                    format!("'{}' is not a whole number", value),
                )
            })
        })
        .transpose()?;
    application.lms_status = text(ImportField::LmsStatus)
        .map(|value| {
            value
                .parse::<CollectionStatus>()
                .map(|status| status.as_str().to_string())
                .map_err(|e| (Some("lms status"), e.to_string()))
        })
        .transpose()?;

    Ok(application)
}
