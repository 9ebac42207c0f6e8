//! Board row and snapshot models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::applications::Application;
use crate::calling::CallingSummary;
use crate::comments::CommentView;
use crate::filters::{FilterDimension, Filterable};
use crate::ptp::PtpBucket;
use crate::status::{CollectionStatus, MergedStatus};
use crate::utils::Period;

/// One application with everything the board shows for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRow {
    pub application: Application,
    pub status: MergedStatus,
    pub ptp_date: Option<NaiveDate>,
    pub ptp_bucket: PtpBucket,
    pub calling: CallingSummary,
    pub recent_comments: Vec<CommentView>,
}

impl ApplicationRow {
    pub fn applicant_id(&self) -> &str {
        &self.application.applicant_id
    }

    pub fn current_status(&self) -> CollectionStatus {
        self.status.status
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Filterable for ApplicationRow {
    fn dimension_value(&self, dimension: FilterDimension) -> Option<String> {
        let app = &self.application;
        match dimension {
            FilterDimension::Branch => non_blank(&app.branch_name),
            FilterDimension::TeamLead => non_blank(&app.team_lead),
            FilterDimension::Rm => non_blank(&app.rm_name),
            FilterDimension::CollectionRm => non_blank(&app.collection_rm),
            FilterDimension::Dealer => non_blank(&app.dealer_name),
            FilterDimension::Lender => non_blank(&app.lender_name),
            FilterDimension::Status => Some(self.status.status.as_str().to_string()),
            FilterDimension::PtpDate => Some(self.ptp_bucket.as_str().to_string()),
            FilterDimension::RepaymentNumber => non_blank(&app.repayment),
            FilterDimension::LastMonthBounce => app.last_month_bounce.map(|n| n.to_string()),
        }
    }
}

/// The rows of one successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub period: Period,
    pub rows: Vec<ApplicationRow>,
    /// Sequence number of the refresh that produced this snapshot; 0 before the first.
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BoardSnapshot {
    pub fn empty(period: Period) -> Self {
        Self {
            period,
            rows: Vec::new(),
            generation: 0,
            refreshed_at: None,
        }
    }

    pub fn row(&self, applicant_id: &str) -> Option<&ApplicationRow> {
        self.rows.iter().find(|row| row.applicant_id() == applicant_id)
    }
}
