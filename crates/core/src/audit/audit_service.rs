use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::audit_model::{AuditLogEntry, AuditLogView, NewAuditLogEntry};
use crate::constants::AUDIT_LOGS_TABLE;
use crate::errors::Result;
use crate::profiles::ProfileCache;
use crate::store::{decode_rows, encode_row, DataStore, SelectQuery};
use crate::utils::require_non_empty;

#[derive(Serialize)]
struct AuditLogInsert<'a> {
    #[serde(flatten)]
    entry: &'a NewAuditLogEntry,
    created_at: DateTime<Utc>,
}

/// Append-only access to `audit_logs`.
pub struct AuditLogService {
    store: Arc<dyn DataStore>,
    profiles: Arc<ProfileCache>,
}

impl AuditLogService {
    pub fn new(store: Arc<dyn DataStore>, profiles: Arc<ProfileCache>) -> Self {
        Self { store, profiles }
    }

    /// Appends one entry. Entries that record no change are skipped.
    pub async fn record(&self, entry: NewAuditLogEntry) -> Result<()> {
        require_non_empty("application_id", &entry.application_id)?;
        require_non_empty("field", &entry.field)?;
        require_non_empty("user_id", &entry.user_id)?;

        if !entry.is_change() {
            debug!(
                "Skipping audit entry for {} on {}: value unchanged",
                entry.field, entry.application_id
            );
            return Ok(());
        }

        let row = encode_row(
            AUDIT_LOGS_TABLE,
            &AuditLogInsert {
                entry: &entry,
                created_at: Utc::now(),
            },
        )?;
        self.store.insert(AUDIT_LOGS_TABLE, row).await?;
        Ok(())
    }

    /// Records an entry, logging instead of failing. Used after a successful
    /// mutation, which must not be reported as failed because its audit row was lost.
    pub async fn record_best_effort(&self, entry: NewAuditLogEntry) {
        let application_id = entry.application_id.clone();
        if let Err(e) = self.record(entry).await {
            warn!("Failed to write audit log for {}: {}", application_id, e);
        }
    }

    /// Returns an application's history, newest first.
    pub async fn history(&self, application_id: &str) -> Vec<AuditLogView> {
        let rows = match self
            .store
            .select(
                SelectQuery::from(AUDIT_LOGS_TABLE)
                    .eq("application_id", application_id)
                    .order_desc("created_at"),
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to load audit history for {}: {}", application_id, e);
                return Vec::new();
            }
        };

        let entries: Vec<AuditLogEntry> = decode_rows(AUDIT_LOGS_TABLE, rows);
        let user_ids: HashSet<String> = entries.iter().map(|e| e.user_id.clone()).collect();
        let names = self.profiles.resolve_many(&user_ids).await;

        entries
            .into_iter()
            .map(|entry| AuditLogView {
                user_name: names
                    .get(&entry.user_id)
                    .cloned()
                    .unwrap_or_else(|| entry.user_id.clone()),
                field: entry.field,
                previous_value: entry.previous_value,
                new_value: entry.new_value,
                created_at: entry.created_at,
            })
            .collect()
    }
}
