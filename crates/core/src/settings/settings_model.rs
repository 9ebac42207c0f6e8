use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CHANGE_DEBOUNCE_MS, DEFAULT_DEDUP_SWEEP_INTERVAL_MS, DEFAULT_DEDUP_TTL_MS,
    DEFAULT_RECENT_COMMENT_LIMIT, DEFAULT_RESUME_REFRESH_DELAY_MS, WATCHED_TABLES,
};

/// Tunables for a mounted collections board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionsSettings {
    pub dedup_ttl_ms: u64,
    pub dedup_sweep_interval_ms: u64,
    pub change_debounce_ms: u64,
    pub resume_refresh_delay_ms: u64,
    pub recent_comment_limit: usize,
    pub watched_tables: Vec<String>,
}

impl Default for CollectionsSettings {
    fn default() -> Self {
        Self {
            dedup_ttl_ms: DEFAULT_DEDUP_TTL_MS,
            dedup_sweep_interval_ms: DEFAULT_DEDUP_SWEEP_INTERVAL_MS,
            change_debounce_ms: DEFAULT_CHANGE_DEBOUNCE_MS,
            resume_refresh_delay_ms: DEFAULT_RESUME_REFRESH_DELAY_MS,
            recent_comment_limit: DEFAULT_RECENT_COMMENT_LIMIT,
            watched_tables: WATCHED_TABLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CollectionsSettings {
    /// Defaults overridden by `LOANTRACK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `LOANTRACK_*` key. Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        override_millis(&lookup, "LOANTRACK_DEDUP_TTL_MS", &mut settings.dedup_ttl_ms);
        override_millis(
            &lookup,
            "LOANTRACK_DEDUP_SWEEP_INTERVAL_MS",
            &mut settings.dedup_sweep_interval_ms,
        );
        override_millis(
            &lookup,
            "LOANTRACK_CHANGE_DEBOUNCE_MS",
            &mut settings.change_debounce_ms,
        );
        override_millis(
            &lookup,
            "LOANTRACK_RESUME_REFRESH_DELAY_MS",
            &mut settings.resume_refresh_delay_ms,
        );
        override_with(
            &lookup,
            "LOANTRACK_RECENT_COMMENT_LIMIT",
            &mut settings.recent_comment_limit,
        );
        if let Some(raw) = lookup("LOANTRACK_WATCHED_TABLES") {
            let tables: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if tables.is_empty() {
                warn!("Ignoring empty LOANTRACK_WATCHED_TABLES");
            } else {
                settings.watched_tables = tables;
            }
        }
        settings
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_ms)
    }

    pub fn dedup_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.dedup_sweep_interval_ms)
    }

    pub fn change_debounce(&self) -> Duration {
        Duration::from_millis(self.change_debounce_ms)
    }

    pub fn resume_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.resume_refresh_delay_ms)
    }
}

fn override_with<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring invalid value '{}' for {}", raw, key),
        }
    }
}

/// Like `override_with`, but zero is rejected: every millisecond setting
/// drives a timer that needs a non-zero period.
fn override_millis<F>(lookup: &F, key: &str, target: &mut u64)
where
    F: Fn(&str) -> Option<String>,
{
    let mut value = *target;
    override_with(lookup, key, &mut value);
    if value == 0 {
        warn!("Ignoring zero duration for {}", key);
    } else {
        *target = value;
    }
}
