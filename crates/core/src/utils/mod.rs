pub mod latest;
pub mod time_utils;
pub mod validation;

pub use latest::{latest_by_key, Timestamped};
pub use time_utils::{parse_calendar_date, parse_timestamp, Period};
pub use validation::require_non_empty;
