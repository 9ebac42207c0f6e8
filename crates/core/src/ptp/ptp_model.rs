//! Promise-to-pay domain models.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::utils::{parse_calendar_date, parse_timestamp, Period, Timestamped};

/// A stored `ptp_dates` row. A `None` date is a cleared promise, which is
/// different from having no row at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PtpRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub application_id: String,
    #[serde(default)]
    pub demand_date: Option<Period>,
    #[serde(default, deserialize_with = "deserialize_lenient_date")]
    pub ptp_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for PtpRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Input model for appending a promise-to-pay row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPtpRecord {
    pub application_id: String,
    pub demand_date: Period,
    pub ptp_date: Option<NaiveDate>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Accepts `YYYY-MM-DD`, a full timestamp, null, or an empty string.
fn deserialize_lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_calendar_date(text)
            .ok()
            .or_else(|| parse_timestamp(text).map(|ts| ts.date_naive()))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid ptp_date '{}'", text))),
    }
}

/// Where a promise-to-pay date falls relative to today.
///
/// Buckets are mutually exclusive: `Tomorrow` is not part of `Future`.
/// Declaration order is chronological and is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PtpBucket {
    Overdue,
    Today,
    Tomorrow,
    Future,
    #[serde(rename = "No PTP")]
    NoPtp,
}

impl PtpBucket {
    pub const ALL: [PtpBucket; 5] = [
        PtpBucket::Overdue,
        PtpBucket::Today,
        PtpBucket::Tomorrow,
        PtpBucket::Future,
        PtpBucket::NoPtp,
    ];

    pub fn classify(ptp_date: Option<NaiveDate>, today: NaiveDate) -> Self {
        let Some(date) = ptp_date else {
            return PtpBucket::NoPtp;
        };
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        if date < today {
            PtpBucket::Overdue
        } else if date == today {
            PtpBucket::Today
        } else if date == tomorrow {
            PtpBucket::Tomorrow
        } else {
            PtpBucket::Future
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PtpBucket::Overdue => "Overdue",
            PtpBucket::Today => "Today",
            PtpBucket::Tomorrow => "Tomorrow",
            PtpBucket::Future => "Future",
            PtpBucket::NoPtp => "No PTP",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        PtpBucket::ALL.into_iter().find(|b| b.as_str() == label)
    }
}

impl fmt::Display for PtpBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
