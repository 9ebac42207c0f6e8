//! Core error types for LoanTrack.
//!
//! This module defines database-agnostic error types. Errors raised by the
//! hosted data store client are converted to these types at the `DataStore`
//! boundary. Every type here is `Clone` so that callers sharing one
//! deduplicated request all observe the same failure.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the collections core.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for data store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// A select, insert or upsert failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A row could not be mapped into a domain record.
    #[error("Malformed row in '{table}': {message}")]
    MalformedRow { table: String, message: String },

    /// Subscribing to table changes failed.
    #[error("Subscription to '{0}' failed")]
    SubscriptionFailed(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Unknown status value '{0}'")]
    UnknownStatus(String),

    #[error("Invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(String),
}

// === From implementations for common error types ===

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err.to_string()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Import(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Import(err.to_string())
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_wraps_into_root() {
        let err: Error = DatabaseError::QueryFailed("timeout".to_string()).into();
        assert_eq!(err.to_string(), "Database operation failed: Query failed: timeout");
    }

    #[test]
    fn test_errors_are_cloneable_for_shared_requests() {
        let err = Error::Validation(ValidationError::MissingField("applicant_id".to_string()));
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }
}
