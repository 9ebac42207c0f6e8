/// Table holding one row per loan application and demand period.
pub const APPLICATIONS_TABLE: &str = "applications";

/// Append-only field-team status updates.
pub const FIELD_STATUS_TABLE: &str = "field_status";

/// Append-only collection (LMS) status records.
pub const COLLECTION_STATUS_TABLE: &str = "collection_status";

/// Append-only promise-to-pay records.
pub const PTP_DATES_TABLE: &str = "ptp_dates";

/// Append-only calling outcomes per contact role.
pub const CALLING_STATUS_TABLE: &str = "contact_calling_status";

pub const COMMENTS_TABLE: &str = "comments";

pub const AUDIT_LOGS_TABLE: &str = "audit_logs";

pub const PROFILES_TABLE: &str = "profiles";

/// Tables whose changes can invalidate what a board displays.
pub const WATCHED_TABLES: [&str; 7] = [
    APPLICATIONS_TABLE,
    FIELD_STATUS_TABLE,
    COLLECTION_STATUS_TABLE,
    PTP_DATES_TABLE,
    CALLING_STATUS_TABLE,
    COMMENTS_TABLE,
    AUDIT_LOGS_TABLE,
];

/// Default time-to-live for deduplicated requests, in milliseconds.
pub const DEFAULT_DEDUP_TTL_MS: u64 = 5_000;

/// Default interval between sweeps of stale deduplication entries, in milliseconds.
pub const DEFAULT_DEDUP_SWEEP_INTERVAL_MS: u64 = 30_000;

/// Trailing-edge debounce window for change notifications, in milliseconds.
pub const DEFAULT_CHANGE_DEBOUNCE_MS: u64 = 1_000;

/// Delay before the forced refresh that follows a resume, in milliseconds.
pub const DEFAULT_RESUME_REFRESH_DELAY_MS: u64 = 500;

/// Number of comments surfaced per application in list views.
pub const DEFAULT_RECENT_COMMENT_LIMIT: usize = 3;

/// Display name used when a profile cannot be resolved.
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Calling status reported for a contact role with no logged call.
pub const NOT_CALLED: &str = "Not Called";

/// Group label for rows without a value in the grouping dimension.
pub const UNASSIGNED_GROUP: &str = "Unassigned";

/// Maximum number of ids placed in a single `IN` filter.
pub const IN_QUERY_CHUNK_SIZE: usize = 200;

/// Actor recorded on status rows written by a bulk import.
pub const IMPORT_USER_ID: &str = "import";
