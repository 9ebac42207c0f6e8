use std::io::Write;

use csv::WriterBuilder;
use log::info;
use rust_decimal::Decimal;

use crate::board::ApplicationRow;
use crate::calling::ContactRole;
use crate::errors::Result;

const EXPORT_HEADERS: [&str; 23] = [
    "Applicant ID",
    "Applicant Name",
    "Branch",
    "Team Lead",
    "RM",
    "Collection RM",
    "Dealer",
    "Lender",
    "Repayment",
    "Mobile",
    "EMI Amount",
    "Principal Due",
    "Interest Due",
    "Demand Date",
    "Current Status",
    "Field Status",
    "LMS Status",
    "PTP Date",
    "PTP Bucket",
    "Applicant Calling",
    "Co-Applicant Calling",
    "Guarantor Calling",
    "Reference Calling",
];

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn amount(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

/// Writes board rows with their current status, PTP and calling outcomes.
/// The header names are accepted back by `parse_applications_csv`.
pub fn write_rows_csv<W: Write>(rows: &[ApplicationRow], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(EXPORT_HEADERS)?;

    for row in rows {
        let app = &row.application;
        let mut record = vec![
            app.applicant_id.clone(),
            app.applicant_name.clone(),
            text(&app.branch_name),
            text(&app.team_lead),
            text(&app.rm_name),
            text(&app.collection_rm),
            text(&app.dealer_name),
            text(&app.lender_name),
            text(&app.repayment),
            text(&app.applicant_mobile),
            amount(app.emi_amount),
            amount(app.principal_due),
            amount(app.interest_due),
            app.demand_date.map(|p| p.key()).unwrap_or_default(),
            row.status.status.to_string(),
            row.status
                .field_status
                .map(|s| s.to_string())
                .unwrap_or_default(),
            row.status
                .collection_status
                .map(|s| s.to_string())
                .unwrap_or_default(),
            row.ptp_date.map(|d| d.to_string()).unwrap_or_default(),
            row.ptp_bucket.to_string(),
        ];
        record.extend(
            ContactRole::ALL
                .iter()
                .map(|role| row.calling.get(*role).to_string()),
        );
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    info!("Exported {} board row(s)", rows.len());
    Ok(())
}
