use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};

/// A demand period: the calendar month an EMI obligation belongs to.
///
/// Stored as the first day of the month. The canonical text form is
/// `YYYY-MM`, which is also the value written to `demand_date` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(NaiveDate);

impl Period {
    /// Creates a period from year and month components.
    /// Returns None if the month is out of range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Returns the period a date falls in.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Formats the period as "YYYY-MM".
    pub fn key(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for Period {
    type Err = Error;

    /// Accepts `YYYY-MM`, or a full `YYYY-MM-DD` date normalized to its month.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| Error::Validation(ValidationError::InvalidPeriod(s.to_string())))
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.key()
    }
}

/// Parses a user-supplied calendar date in strict `YYYY-MM-DD` form.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(ValidationError::MissingField(
            "date".to_string(),
        )));
    }
    Ok(NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")?)
}

/// Parses a timestamp column value.
///
/// The hosted store returns RFC 3339 strings; bulk-imported rows may carry a
/// naive `YYYY-MM-DD HH:MM:SS` form, which is read as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parses_month_key() {
        let period: Period = "2025-07".parse().unwrap();
        assert_eq!(period.key(), "2025-07");
        assert_eq!(period.first_day(), NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }

    #[test]
    fn test_period_normalizes_full_date() {
        let period: Period = "2025-07-19".parse().unwrap();
        assert_eq!(period, Period::new(2025, 7).unwrap());
        assert!(period.contains(NaiveDate::from_ymd_opt(2025, 7, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap()));
    }

    #[test]
    fn test_period_rejects_garbage() {
        assert!("July".parse::<Period>().is_err());
        assert!("2025-13".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_serde_uses_month_key() {
        let period = Period::new(2024, 12).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2024-12\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }

    #[test]
    fn test_parse_calendar_date_is_strict() {
        assert!(parse_calendar_date("2025-07-04").is_ok());
        assert!(parse_calendar_date("04/07/2025").is_err());
        assert!(parse_calendar_date("  ").is_err());
    }

    #[test]
    fn test_parse_timestamp_accepts_both_forms() {
        let a = parse_timestamp("2025-07-01T10:00:00Z").unwrap();
        let b = parse_timestamp("2025-07-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
