//! Change routing types and the listener trait.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    APPLICATIONS_TABLE, AUDIT_LOGS_TABLE, CALLING_STATUS_TABLE, COLLECTION_STATUS_TABLE,
    COMMENTS_TABLE, FIELD_STATUS_TABLE, PTP_DATES_TABLE,
};
use crate::settings::CollectionsSettings;

/// Lifecycle of a router subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    /// Forwarding accepted changes.
    Active,
    /// Hidden; changes are dropped.
    Paused,
    /// Unsubscribed; terminal.
    Closed,
}

/// Group of tables whose changes are coalesced together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Applications,
    Status,
    Ptp,
    Calling,
    Comments,
    Audit,
}

impl ChangeKind {
    pub fn for_table(table: &str) -> Option<Self> {
        match table {
            APPLICATIONS_TABLE => Some(ChangeKind::Applications),
            FIELD_STATUS_TABLE | COLLECTION_STATUS_TABLE => Some(ChangeKind::Status),
            PTP_DATES_TABLE => Some(ChangeKind::Ptp),
            CALLING_STATUS_TABLE => Some(ChangeKind::Calling),
            COMMENTS_TABLE => Some(ChangeKind::Comments),
            AUDIT_LOGS_TABLE => Some(ChangeKind::Audit),
            _ => None,
        }
    }
}

/// Why a listener is asked to refresh. Carries no row data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshTrigger {
    /// A burst of changes of one kind has settled.
    Changed(ChangeKind),
    /// The view became visible again and must re-fetch everything.
    Resync,
}

/// Receives refresh triggers from a `ChangeNotificationRouter`.
///
/// `on_change` runs on the router's worker and must be fast and
/// non-blocking. It must not call back into the router.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, trigger: RefreshTrigger);
}

/// Listener that records every trigger, for tests.
#[derive(Clone, Default)]
pub struct MockChangeListener {
    triggers: Arc<Mutex<Vec<RefreshTrigger>>>,
}

impl MockChangeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triggers(&self) -> Vec<RefreshTrigger> {
        self.triggers.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.lock().unwrap().is_empty()
    }
}

impl ChangeListener for MockChangeListener {
    fn on_change(&self, trigger: RefreshTrigger) {
        self.triggers.lock().unwrap().push(trigger);
    }
}

/// Router timing and the tables it subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    pub debounce: Duration,
    pub resume_delay: Duration,
    pub tables: Vec<String>,
}

impl RouterOptions {
    pub fn from_settings(settings: &CollectionsSettings) -> Self {
        Self {
            debounce: settings.change_debounce(),
            resume_delay: settings.resume_refresh_delay(),
            tables: settings.watched_tables.clone(),
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from_settings(&CollectionsSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tables_share_a_kind() {
        assert_eq!(ChangeKind::for_table("field_status"), Some(ChangeKind::Status));
        assert_eq!(ChangeKind::for_table("collection_status"), Some(ChangeKind::Status));
        assert_eq!(ChangeKind::for_table("contact_calling_status"), Some(ChangeKind::Calling));
        assert_eq!(ChangeKind::for_table("profiles"), None);
    }
}
