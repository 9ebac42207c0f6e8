//! Audit log domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::Timestamped;

/// Field names written to `audit_logs.field`.
pub mod audit_fields {
    pub const FIELD_STATUS: &str = "field_status";
    pub const LMS_STATUS: &str = "lms_status";
    pub const PTP_DATE: &str = "ptp_date";
    pub const COMMENT: &str = "comment";
}

/// A stored audit log row. Rows are only ever inserted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub application_id: String,
    pub field: String,
    #[serde(default)]
    pub previous_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for AuditLogEntry {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input model for recording a change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAuditLogEntry {
    pub application_id: String,
    pub field: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub user_id: String,
}

impl NewAuditLogEntry {
    pub fn change(
        application_id: &str,
        field: &str,
        previous_value: Option<String>,
        new_value: Option<String>,
        user_id: &str,
    ) -> Self {
        Self {
            application_id: application_id.to_string(),
            field: field.to_string(),
            previous_value,
            new_value,
            user_id: user_id.to_string(),
        }
    }

    /// True when the entry would record an actual change.
    pub fn is_change(&self) -> bool {
        self.previous_value != self.new_value
    }
}

/// Audit entry as shown in an application's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogView {
    pub field: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}
