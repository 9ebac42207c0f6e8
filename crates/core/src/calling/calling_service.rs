use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};

use super::calling_model::{
    CallingStatusRecord, CallingSummary, ContactRole, NewCallingStatusRecord,
};
use crate::audit::{AuditLogService, NewAuditLogEntry};
use crate::constants::{CALLING_STATUS_TABLE, NOT_CALLED};
use crate::errors::{Error, Result};
use crate::store::{decode_rows, encode_row, select_for_ids, DataStore, SelectQuery};
use crate::utils::{latest_by_key, require_non_empty, Period};

pub struct CallingStatusService {
    store: Arc<dyn DataStore>,
    audit: Arc<AuditLogService>,
}

impl CallingStatusService {
    pub fn new(store: Arc<dyn DataStore>, audit: Arc<AuditLogService>) -> Self {
        Self { store, audit }
    }

    /// Latest outcome per (application, role). Every requested id gets a
    /// summary; roles without a logged call read "Not Called".
    pub async fn latest_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, CallingSummary> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let records = match self.fetch_records(ids, period).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to fetch calling statuses: {}", e);
                return HashMap::new();
            }
        };

        let mut summaries: HashMap<String, CallingSummary> = ids
            .iter()
            .map(|id| (id.clone(), CallingSummary::default()))
            .collect();
        for ((application_id, role), record) in
            latest_by_key(records, |r| (r.application_id.clone(), r.contact_type))
        {
            summaries
                .entry(application_id)
                .or_default()
                .set(role, record.status);
        }
        summaries
    }

    async fn fetch_records(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> Result<Vec<CallingStatusRecord>> {
        let mut query = SelectQuery::from(CALLING_STATUS_TABLE).order_desc("created_at");
        if let Some(period) = period {
            query = query.eq("demand_date", period.key());
        }
        let rows = select_for_ids(self.store.as_ref(), query, "application_id", ids).await?;
        Ok(decode_rows(CALLING_STATUS_TABLE, rows))
    }

    /// Logs the outcome of a call to one contact of `applicant_id`.
    pub async fn log_call(
        &self,
        applicant_id: &str,
        role: ContactRole,
        status: &str,
        period: Period,
        actor_id: &str,
    ) -> bool {
        match self
            .try_log_call(applicant_id, role, status, period, actor_id)
            .await
        {
            Ok(()) => true,
            Err(Error::Validation(e)) => {
                warn!("Rejected calling status for '{}': {}", applicant_id, e);
                false
            }
            Err(e) => {
                error!("Failed to save calling status for {}: {}", applicant_id, e);
                false
            }
        }
    }

    async fn try_log_call(
        &self,
        applicant_id: &str,
        role: ContactRole,
        status: &str,
        period: Period,
        actor_id: &str,
    ) -> Result<()> {
        require_non_empty("applicant_id", applicant_id)?;
        require_non_empty("status", status)?;
        require_non_empty("user_id", actor_id)?;

        let ids = HashSet::from([applicant_id.to_string()]);
        let previous = self
            .latest_many(&ids, Some(period))
            .await
            .remove(applicant_id)
            .map(|summary| summary.get(role).to_string())
            .filter(|s| s != NOT_CALLED);

        let record = NewCallingStatusRecord {
            application_id: applicant_id.to_string(),
            contact_type: role,
            status: status.trim().to_string(),
            demand_date: period,
            user_id: actor_id.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .insert(
                CALLING_STATUS_TABLE,
                encode_row(CALLING_STATUS_TABLE, &record)?,
            )
            .await?;
        info!(
            "Logged {} call for {} ({}): {}",
            role, applicant_id, period, record.status
        );

        self.audit
            .record_best_effort(NewAuditLogEntry::change(
                applicant_id,
                &role.audit_field(),
                previous,
                Some(record.status.clone()),
                actor_id,
            ))
            .await;
        Ok(())
    }
}
