//! Resolvers for the two status tracks.
//!
//! Both read an append-only table and reduce it to the latest record per
//! application. They differ in table and in how a missing period is handled:
//! the field track fails fast with an empty result, the collection track
//! falls back to the latest record across all periods.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::status_model::{CollectionStatus, StatusRecord, StatusSource};
use super::status_traits::StatusResolverTrait;
use crate::constants::{COLLECTION_STATUS_TABLE, FIELD_STATUS_TABLE};
use crate::errors::Result;
use crate::store::{decode_rows, select_for_ids, DataStore, SelectQuery};
use crate::utils::{latest_by_key, Period};

/// Loads the latest parseable status per application from `table`.
async fn fetch_latest_statuses(
    store: &dyn DataStore,
    table: &str,
    ids: &HashSet<String>,
    period: Option<Period>,
) -> Result<HashMap<String, CollectionStatus>> {
    let mut query = SelectQuery::from(table).order_desc("created_at");
    if let Some(period) = period {
        query = query.eq("demand_date", period.key());
    }

    let rows = select_for_ids(store, query, "application_id", ids).await?;
    let records: Vec<StatusRecord> = decode_rows(table, rows);

    // Unknown labels are dropped before selecting the latest row, so a
    // garbage write never masks the last valid status.
    let valid = records.into_iter().filter(|record| {
        let known = record.status.parse::<CollectionStatus>().is_ok();
        if !known {
            warn!(
                "Ignoring unknown status '{}' for {} in {}",
                record.status, record.application_id, table
            );
        }
        known
    });

    Ok(latest_by_key(valid, |record| record.application_id.clone())
        .into_iter()
        .filter_map(|(id, record)| record.status.parse().ok().map(|status| (id, status)))
        .collect())
}

/// Field-team status track (`field_status`).
pub struct FieldStatusResolver {
    store: Arc<dyn DataStore>,
}

impl FieldStatusResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusResolverTrait for FieldStatusResolver {
    fn source(&self) -> StatusSource {
        StatusSource::Field
    }

    async fn fetch_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, CollectionStatus> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let Some(period) = period else {
            debug!("No period selected, skipping field status lookup");
            return HashMap::new();
        };

        match fetch_latest_statuses(self.store.as_ref(), FIELD_STATUS_TABLE, ids, Some(period)).await
        {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!("Failed to fetch field statuses for {}: {}", period, e);
                HashMap::new()
            }
        }
    }
}

/// Collection (LMS) status track (`collection_status`).
pub struct CollectionStatusResolver {
    store: Arc<dyn DataStore>,
}

impl CollectionStatusResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusResolverTrait for CollectionStatusResolver {
    fn source(&self) -> StatusSource {
        StatusSource::Collection
    }

    async fn fetch_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, CollectionStatus> {
        if ids.is_empty() {
            return HashMap::new();
        }

        match fetch_latest_statuses(self.store.as_ref(), COLLECTION_STATUS_TABLE, ids, period).await
        {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!("Failed to fetch collection statuses: {}", e);
                HashMap::new()
            }
        }
    }
}
