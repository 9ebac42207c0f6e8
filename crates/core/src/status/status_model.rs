//! Status domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};
use crate::utils::{Period, Timestamped};

/// Payment status of an application for one demand period.
///
/// Declaration order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollectionStatus {
    #[serde(rename = "Unpaid")]
    Unpaid,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
    #[serde(rename = "Cash Collected from Customer")]
    CashCollected,
    #[serde(rename = "Customer Deposited to Bank")]
    DepositedToBank,
    #[serde(rename = "Paid")]
    Paid,
    #[serde(rename = "Paid (Pending Approval)")]
    PaidPendingApproval,
}

impl CollectionStatus {
    pub const ALL: [CollectionStatus; 6] = [
        CollectionStatus::Unpaid,
        CollectionStatus::PartiallyPaid,
        CollectionStatus::CashCollected,
        CollectionStatus::DepositedToBank,
        CollectionStatus::Paid,
        CollectionStatus::PaidPendingApproval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Unpaid => "Unpaid",
            CollectionStatus::PartiallyPaid => "Partially Paid",
            CollectionStatus::CashCollected => "Cash Collected from Customer",
            CollectionStatus::DepositedToBank => "Customer Deposited to Bank",
            CollectionStatus::Paid => "Paid",
            CollectionStatus::PaidPendingApproval => "Paid (Pending Approval)",
        }
    }

    /// True for statuses that count the EMI as collected.
    pub fn is_collected(&self) -> bool {
        matches!(
            self,
            CollectionStatus::Paid | CollectionStatus::PaidPendingApproval
        )
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = Error;

    /// Matches the canonical labels, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        CollectionStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::Validation(ValidationError::UnknownStatus(s.to_string())))
    }
}

/// Which status track a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Field,
    Collection,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::Field => "field",
            StatusSource::Collection => "collection",
        }
    }
}

/// A stored status row from either track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub application_id: String,
    #[serde(default)]
    pub demand_date: Option<Period>,
    pub status: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for StatusRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input model for appending a status row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewStatusRecord {
    pub application_id: String,
    pub demand_date: Period,
    pub status: CollectionStatus,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Which precedence rule produced a merged status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOrigin {
    /// Collection track confirmed payment.
    CollectionPaid,
    /// An explicit field update other than "Unpaid".
    FieldUpdate,
    /// Non-authoritative collection value.
    Collection,
    /// Neither track has a record.
    Default,
}

/// Merged status with both inputs, for views that show where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedStatus {
    pub status: CollectionStatus,
    pub origin: StatusOrigin,
    pub field_status: Option<CollectionStatus>,
    pub collection_status: Option<CollectionStatus>,
}
