use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};

use super::status_model::{CollectionStatus, NewStatusRecord, StatusSource};
use super::status_resolvers::{CollectionStatusResolver, FieldStatusResolver};
use super::status_traits::StatusResolverTrait;
use crate::audit::{audit_fields, AuditLogService, NewAuditLogEntry};
use crate::constants::{COLLECTION_STATUS_TABLE, FIELD_STATUS_TABLE};
use crate::errors::{Error, Result};
use crate::store::{encode_row, DataStore};
use crate::utils::{require_non_empty, Period};

/// Appends status rows to either track and audits the change.
///
/// Mutations report success as a boolean: validation failures are rejected
/// before anything is written, and data-source failures are logged.
pub struct FieldStatusService {
    store: Arc<dyn DataStore>,
    audit: Arc<AuditLogService>,
    field_resolver: FieldStatusResolver,
    collection_resolver: CollectionStatusResolver,
}

impl FieldStatusService {
    pub fn new(store: Arc<dyn DataStore>, audit: Arc<AuditLogService>) -> Self {
        Self {
            field_resolver: FieldStatusResolver::new(store.clone()),
            collection_resolver: CollectionStatusResolver::new(store.clone()),
            store,
            audit,
        }
    }

    /// Records a field-team status update for `applicant_id` in `period`.
    pub async fn update_field_status(
        &self,
        applicant_id: &str,
        status: CollectionStatus,
        period: Period,
        actor_id: &str,
    ) -> bool {
        self.report(
            applicant_id,
            self.append(StatusSource::Field, applicant_id, status, period, actor_id)
                .await,
        )
    }

    /// Records a collection (LMS) status for `applicant_id` in `period`.
    pub async fn record_collection_status(
        &self,
        applicant_id: &str,
        status: CollectionStatus,
        period: Period,
        actor_id: &str,
    ) -> bool {
        self.report(
            applicant_id,
            self.append(StatusSource::Collection, applicant_id, status, period, actor_id)
                .await,
        )
    }

    fn report(&self, applicant_id: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(Error::Validation(e)) => {
                warn!("Rejected status update for '{}': {}", applicant_id, e);
                false
            }
            Err(e) => {
                error!("Failed to save status for {}: {}", applicant_id, e);
                false
            }
        }
    }

    async fn append(
        &self,
        source: StatusSource,
        applicant_id: &str,
        status: CollectionStatus,
        period: Period,
        actor_id: &str,
    ) -> Result<()> {
        require_non_empty("applicant_id", applicant_id)?;
        require_non_empty("user_id", actor_id)?;

        let (table, field, resolver): (&str, &str, &dyn StatusResolverTrait) = match source {
            StatusSource::Field => (
                FIELD_STATUS_TABLE,
                audit_fields::FIELD_STATUS,
                &self.field_resolver,
            ),
            StatusSource::Collection => (
                COLLECTION_STATUS_TABLE,
                audit_fields::LMS_STATUS,
                &self.collection_resolver,
            ),
        };

        let ids = HashSet::from([applicant_id.to_string()]);
        let previous = resolver.fetch_many(&ids, Some(period)).await.remove(applicant_id);

        let record = NewStatusRecord {
            application_id: applicant_id.to_string(),
            demand_date: period,
            status,
            user_id: actor_id.to_string(),
            created_at: Utc::now(),
        };
        self.store.insert(table, encode_row(table, &record)?).await?;
        info!(
            "{} status for {} ({}) set to '{}'",
            source.as_str(),
            applicant_id,
            period,
            status
        );

        self.audit
            .record_best_effort(NewAuditLogEntry::change(
                applicant_id,
                field,
                previous.map(|s| s.to_string()),
                Some(status.to_string()),
                actor_id,
            ))
            .await;
        Ok(())
    }
}
