//! Calling status domain models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::NOT_CALLED;
use crate::utils::{Period, Timestamped};

/// The contact an outbound call was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    Applicant,
    CoApplicant,
    Guarantor,
    Reference,
}

impl ContactRole {
    pub const ALL: [ContactRole; 4] = [
        ContactRole::Applicant,
        ContactRole::CoApplicant,
        ContactRole::Guarantor,
        ContactRole::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactRole::Applicant => "applicant",
            ContactRole::CoApplicant => "co_applicant",
            ContactRole::Guarantor => "guarantor",
            ContactRole::Reference => "reference",
        }
    }

    /// Field name used for this role in the audit log.
    pub fn audit_field(&self) -> String {
        format!("{}_calling_status", self.as_str())
    }
}

impl fmt::Display for ContactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored `contact_calling_status` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallingStatusRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub application_id: String,
    pub contact_type: ContactRole,
    pub status: String,
    #[serde(default)]
    pub demand_date: Option<Period>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for CallingStatusRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input model for logging a call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCallingStatusRecord {
    pub application_id: String,
    pub contact_type: ContactRole,
    pub status: String,
    pub demand_date: Period,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Latest calling outcome for each contact role of one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallingSummary {
    pub applicant: String,
    pub co_applicant: String,
    pub guarantor: String,
    pub reference: String,
}

impl Default for CallingSummary {
    fn default() -> Self {
        Self {
            applicant: NOT_CALLED.to_string(),
            co_applicant: NOT_CALLED.to_string(),
            guarantor: NOT_CALLED.to_string(),
            reference: NOT_CALLED.to_string(),
        }
    }
}

impl CallingSummary {
    pub fn get(&self, role: ContactRole) -> &str {
        match role {
            ContactRole::Applicant => &self.applicant,
            ContactRole::CoApplicant => &self.co_applicant,
            ContactRole::Guarantor => &self.guarantor,
            ContactRole::Reference => &self.reference,
        }
    }

    pub fn set(&mut self, role: ContactRole, status: String) {
        match role {
            ContactRole::Applicant => self.applicant = status,
            ContactRole::CoApplicant => self.co_applicant = status,
            ContactRole::Guarantor => self.guarantor = status,
            ContactRole::Reference => self.reference = status,
        }
    }

    /// True when at least one role has been called.
    pub fn any_called(&self) -> bool {
        ContactRole::ALL.iter().any(|role| self.get(*role) != NOT_CALLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_defaults_to_not_called() {
        let summary = CallingSummary::default();
        for role in ContactRole::ALL {
            assert_eq!(summary.get(role), NOT_CALLED);
        }
        assert!(!summary.any_called());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ContactRole::CoApplicant).unwrap(),
            "\"co_applicant\""
        );
        assert_eq!(ContactRole::Guarantor.audit_field(), "guarantor_calling_status");
    }
}
