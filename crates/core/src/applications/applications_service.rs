use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use super::applications_model::{Application, FailedRecord, ImportSummary, NewApplication};
use crate::constants::{APPLICATIONS_TABLE, COLLECTION_STATUS_TABLE, IMPORT_USER_ID};
use crate::status::NewStatusRecord;
use crate::errors::Result;
use crate::store::{decode_rows, encode_row, DataStore, SelectQuery};
use crate::utils::Period;

/// Columns identifying one application row per demand period.
const APPLICATION_CONFLICT_KEYS: [&str; 2] = ["applicant_id", "demand_date"];

pub struct ApplicationService {
    store: Arc<dyn DataStore>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Applications due in `period`, ordered by applicant name.
    pub async fn list(&self, period: Period) -> Result<Vec<Application>> {
        let rows = self
            .store
            .select(
                SelectQuery::from(APPLICATIONS_TABLE)
                    .eq("demand_date", period.key())
                    .order_asc("applicant_name"),
            )
            .await?;
        let applications: Vec<Application> = decode_rows(APPLICATIONS_TABLE, rows);
        debug!("Loaded {} application(s) for {}", applications.len(), period);
        Ok(applications)
    }

    /// Most recent period's row for `applicant_id`.
    pub async fn find(&self, applicant_id: &str) -> Result<Option<Application>> {
        let rows = self
            .store
            .select(
                SelectQuery::from(APPLICATIONS_TABLE)
                    .eq("applicant_id", applicant_id.trim())
                    .order_desc("demand_date")
                    .range(0..1),
            )
            .await?;
        Ok(decode_rows::<Application>(APPLICATIONS_TABLE, rows)
            .into_iter()
            .next())
    }

    /// Saves each record, replacing any row for the same applicant and
    /// period. A record carrying an LMS status also appends it to the
    /// collection track. Invalid or failing records are reported, never fatal.
    pub async fn bulk_insert(&self, records: Vec<NewApplication>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for record in records {
            let applicant_id = record.applicant_id.clone();
            match self.save(&record).await {
                Ok(()) => summary.saved += 1,
                Err(e) => {
                    warn!("Skipping application '{}': {}", applicant_id, e);
                    summary.failed.push(FailedRecord {
                        applicant_id,
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Bulk insert finished: {} saved, {} failed",
            summary.saved,
            summary.failed.len()
        );
        summary
    }

    async fn save(&self, record: &NewApplication) -> Result<()> {
        record.validate()?;
        let row = encode_row(APPLICATIONS_TABLE, record)?;
        self.store
            .upsert(APPLICATIONS_TABLE, row, &APPLICATION_CONFLICT_KEYS)
            .await?;

        if let Some(status) = record.collection_status()? {
            let status_row = NewStatusRecord {
                application_id: record.applicant_id.clone(),
                demand_date: record.demand_date,
                status,
                user_id: IMPORT_USER_ID.to_string(),
                created_at: Utc::now(),
            };
            self.store
                .insert(
                    COLLECTION_STATUS_TABLE,
                    encode_row(COLLECTION_STATUS_TABLE, &status_row)?,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDataStore;
    use rust_decimal_macros::dec;

    fn july() -> Period {
        Period::new(2025, 7).unwrap()
    }

    fn record(id: &str, name: &str) -> NewApplication {
        let mut record = NewApplication::new(id, name, july());
        record.branch_name = Some("Pune".to_string());
        record.emi_amount = Some(dec!(4500));
        record
    }

    #[tokio::test]
    async fn test_bulk_insert_then_list_by_name() {
        let store = Arc::new(InMemoryDataStore::new());
        let service = ApplicationService::new(store.clone());

        let summary = service
            .bulk_insert(vec![
                record("APP-2", "Zoya Sheikh"),
                record("APP-1", "Arjun Mehta"),
                record("", "No Id"),
            ])
            .await;
        assert_eq!(summary.saved, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.total(), 3);

        let listed = service.list(july()).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|a| a.applicant_name.as_str()).collect();
        assert_eq!(names, vec!["Arjun Mehta", "Zoya Sheikh"]);
        assert_eq!(listed[0].emi_amount, Some(dec!(4500)));
        assert!(listed[0].id.is_some());

        assert!(service.list(Period::new(2025, 8).unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reimport_replaces_row_for_same_period() {
        let store = Arc::new(InMemoryDataStore::new());
        let service = ApplicationService::new(store.clone());

        service.bulk_insert(vec![record("APP-1", "Arjun Mehta")]).await;
        let mut updated = record("APP-1", "Arjun Mehta");
        updated.emi_amount = Some(dec!(5000));
        service.bulk_insert(vec![updated]).await;

        assert_eq!(store.rows(APPLICATIONS_TABLE).len(), 1);
        let found = service.find("APP-1").await.unwrap().unwrap();
        assert_eq!(found.emi_amount, Some(dec!(5000)));
        assert!(service.find("APP-404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_imported_lms_status_joins_collection_track() {
        let store = Arc::new(InMemoryDataStore::new());
        let service = ApplicationService::new(store.clone());

        let mut paid = record("APP-1", "Arjun Mehta");
        paid.lms_status = Some("Paid".to_string());
        let summary = service
            .bulk_insert(vec![paid, record("APP-2", "Zoya Sheikh")])
            .await;
        assert_eq!(summary.saved, 2);

        let statuses = store.rows(COLLECTION_STATUS_TABLE);
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0]["application_id"], "APP-1");
        assert_eq!(statuses[0]["status"], "Paid");
        assert_eq!(statuses[0]["demand_date"], "2025-07");
        assert_eq!(statuses[0]["user_id"], IMPORT_USER_ID);
    }

    #[tokio::test]
    async fn test_unknown_lms_status_is_rejected() {
        let store = Arc::new(InMemoryDataStore::new());
        let service = ApplicationService::new(store.clone());

        let mut bad = record("APP-1", "Arjun Mehta");
        bad.lms_status = Some("Settled".to_string());
        let summary = service.bulk_insert(vec![bad]).await;

        assert_eq!(summary.saved, 0);
        assert_eq!(summary.failed.len(), 1);
        assert!(store.rows(APPLICATIONS_TABLE).is_empty());
        assert!(store.rows(COLLECTION_STATUS_TABLE).is_empty());
    }

    #[tokio::test]
    async fn test_list_surfaces_store_errors() {
        let store = Arc::new(InMemoryDataStore::new());
        store.fail_table(APPLICATIONS_TABLE);
        let service = ApplicationService::new(store);
        assert!(service.list(july()).await.is_err());
    }
}
