use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{error, info, warn};

use super::ptp_model::{NewPtpRecord, PtpRecord};
use crate::audit::{audit_fields, AuditLogService, NewAuditLogEntry};
use crate::constants::PTP_DATES_TABLE;
use crate::errors::{Error, Result};
use crate::store::{decode_rows, encode_row, select_for_ids, DataStore, SelectQuery};
use crate::utils::{latest_by_key, parse_calendar_date, require_non_empty, Period};

pub struct PtpService {
    store: Arc<dyn DataStore>,
    audit: Arc<AuditLogService>,
}

impl PtpService {
    pub fn new(store: Arc<dyn DataStore>, audit: Arc<AuditLogService>) -> Self {
        Self { store, audit }
    }

    /// Latest promise per application. A key mapped to `None` means the
    /// promise was cleared; a missing key means none was ever recorded.
    pub async fn latest_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, Option<NaiveDate>> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.try_latest_many(ids, period).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!("Failed to fetch PTP dates: {}", e);
                HashMap::new()
            }
        }
    }

    async fn try_latest_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> Result<HashMap<String, Option<NaiveDate>>> {
        let mut query = SelectQuery::from(PTP_DATES_TABLE).order_desc("created_at");
        if let Some(period) = period {
            query = query.eq("demand_date", period.key());
        }
        let rows = select_for_ids(self.store.as_ref(), query, "application_id", ids).await?;
        let records: Vec<PtpRecord> = decode_rows(PTP_DATES_TABLE, rows);

        Ok(latest_by_key(records, |r| r.application_id.clone())
            .into_iter()
            .map(|(id, record)| (id, record.ptp_date))
            .collect())
    }

    /// Sets or clears (`date_text` empty) the promise for `applicant_id`.
    pub async fn set_ptp_date(
        &self,
        applicant_id: &str,
        period: Period,
        date_text: &str,
        actor_id: &str,
    ) -> bool {
        match self.try_set_ptp_date(applicant_id, period, date_text, actor_id).await {
            Ok(()) => true,
            Err(Error::Validation(e)) => {
                warn!("Rejected PTP update for '{}': {}", applicant_id, e);
                false
            }
            Err(e) => {
                error!("Failed to save PTP date for {}: {}", applicant_id, e);
                false
            }
        }
    }

    async fn try_set_ptp_date(
        &self,
        applicant_id: &str,
        period: Period,
        date_text: &str,
        actor_id: &str,
    ) -> Result<()> {
        require_non_empty("applicant_id", applicant_id)?;
        require_non_empty("user_id", actor_id)?;
        let ptp_date = if date_text.trim().is_empty() {
            None
        } else {
            Some(parse_calendar_date(date_text)?)
        };

        let ids = HashSet::from([applicant_id.to_string()]);
        let previous = self
            .latest_many(&ids, Some(period))
            .await
            .remove(applicant_id)
            .flatten();

        let record = NewPtpRecord {
            application_id: applicant_id.to_string(),
            demand_date: period,
            ptp_date,
            user_id: actor_id.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .insert(PTP_DATES_TABLE, encode_row(PTP_DATES_TABLE, &record)?)
            .await?;
        info!(
            "PTP for {} ({}) set to {}",
            applicant_id,
            period,
            ptp_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "cleared".to_string())
        );

        self.audit
            .record_best_effort(NewAuditLogEntry::change(
                applicant_id,
                audit_fields::PTP_DATE,
                previous.map(|d| d.to_string()),
                ptp_date.map(|d| d.to_string()),
                actor_id,
            ))
            .await;
        Ok(())
    }
}
