//! Application domain models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result, ValidationError};
use crate::status::CollectionStatus;
use crate::utils::Period;

/// A loan application for one demand period, as stored in `applications`.
///
/// `applicant_id` is the business id every status, PTP, calling and comment
/// row refers to. `lms_status` and `field_status` are the columns as
/// imported; the live status is always derived from the status tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Application {
    #[serde(default)]
    pub id: Option<String>,
    pub applicant_id: String,
    pub applicant_name: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub team_lead: Option<String>,
    #[serde(default)]
    pub rm_name: Option<String>,
    #[serde(default)]
    pub collection_rm: Option<String>,
    #[serde(default)]
    pub dealer_name: Option<String>,
    #[serde(default)]
    pub lender_name: Option<String>,
    #[serde(default)]
    pub repayment: Option<String>,
    #[serde(default)]
    pub applicant_mobile: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub emi_amount: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub principal_due: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub interest_due: Option<Decimal>,
    #[serde(default)]
    pub last_month_bounce: Option<i64>,
    #[serde(default)]
    pub demand_date: Option<Period>,
    #[serde(default)]
    pub lms_status: Option<String>,
    #[serde(default)]
    pub field_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input model for creating or replacing an application row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewApplication {
    pub applicant_id: String,
    pub applicant_name: String,
    pub branch_name: Option<String>,
    pub team_lead: Option<String>,
    pub rm_name: Option<String>,
    pub collection_rm: Option<String>,
    pub dealer_name: Option<String>,
    pub lender_name: Option<String>,
    pub repayment: Option<String>,
    pub applicant_mobile: Option<String>,
    pub emi_amount: Option<Decimal>,
    pub principal_due: Option<Decimal>,
    pub interest_due: Option<Decimal>,
    pub last_month_bounce: Option<i64>,
    pub demand_date: Period,
    pub lms_status: Option<String>,
}

impl NewApplication {
    pub fn new(applicant_id: &str, applicant_name: &str, demand_date: Period) -> Self {
        Self {
            applicant_id: applicant_id.trim().to_string(),
            applicant_name: applicant_name.trim().to_string(),
            branch_name: None,
            team_lead: None,
            rm_name: None,
            collection_rm: None,
            dealer_name: None,
            lender_name: None,
            repayment: None,
            applicant_mobile: None,
            emi_amount: None,
            principal_due: None,
            interest_due: None,
            last_month_bounce: None,
            demand_date,
            lms_status: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.applicant_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "applicant_id".to_string(),
            )));
        }
        if self.applicant_name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "applicant_name".to_string(),
            )));
        }
        self.collection_status()?;
        Ok(())
    }

    /// The imported LMS status, if any, as a collection-track status.
    pub fn collection_status(&self) -> Result<Option<CollectionStatus>> {
        self.lms_status
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::parse::<CollectionStatus>)
            .transpose()
    }
}

/// A record that could not be saved during a bulk insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecord {
    pub applicant_id: String,
    pub message: String,
}

/// Result of `ApplicationService::bulk_insert`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub saved: usize,
    pub failed: Vec<FailedRecord>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.saved + self.failed.len()
    }
}

/// Parses an amount given as a JSON number or a numeric string.
pub fn parse_amount(text: &str) -> Result<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| Error::Validation(ValidationError::DecimalParse(text.to_string())))
}

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => parse_amount(&n.to_string())
            .map(Some)
            .map_err(de::Error::custom),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_amount(&s).map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("invalid amount {}", other))),
    }
}
