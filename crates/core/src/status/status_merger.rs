//! Reconciles the field and collection status tracks.
//!
//! Precedence, applied per application:
//!
//! 1. Collection status `Paid` wins outright.
//! 2. Otherwise a field status other than `Unpaid` wins.
//! 3. Otherwise the collection status, if any.
//! 4. Otherwise `Unpaid`.
//!
//! A confirmed collection payment can never be overridden by a stale field
//! update, while any explicit field update beats a non-authoritative
//! collection value.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use super::status_model::{CollectionStatus, MergedStatus, StatusOrigin};
use super::status_resolvers::{CollectionStatusResolver, FieldStatusResolver};
use super::status_traits::StatusResolverTrait;
use crate::dedup::RequestDeduplicator;
use crate::store::DataStore;
use crate::utils::Period;

pub type StatusMap = Arc<HashMap<String, CollectionStatus>>;

/// Applies the precedence rule to one application's two inputs.
pub fn resolve_status(
    field: Option<CollectionStatus>,
    collection: Option<CollectionStatus>,
) -> (CollectionStatus, StatusOrigin) {
    match (field, collection) {
        (_, Some(CollectionStatus::Paid)) => (CollectionStatus::Paid, StatusOrigin::CollectionPaid),
        (Some(field), _) if field != CollectionStatus::Unpaid => (field, StatusOrigin::FieldUpdate),
        (_, Some(collection)) => (collection, StatusOrigin::Collection),
        _ => (CollectionStatus::Unpaid, StatusOrigin::Default),
    }
}

/// Dedup key for one resolver call: source, period and the sorted id set.
fn request_key(
    resolver: &dyn StatusResolverTrait,
    ids: &HashSet<String>,
    period: Option<Period>,
) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!(
        "{}:{}:{}",
        resolver.source().as_str(),
        period.map(|p| p.key()).unwrap_or_else(|| "any".to_string()),
        sorted.join(",")
    )
}

pub struct EnhancedStatusManager {
    field_resolver: Arc<dyn StatusResolverTrait>,
    collection_resolver: Arc<dyn StatusResolverTrait>,
    requests: Arc<RequestDeduplicator<StatusMap>>,
}

impl EnhancedStatusManager {
    pub fn new(
        field_resolver: Arc<dyn StatusResolverTrait>,
        collection_resolver: Arc<dyn StatusResolverTrait>,
        requests: Arc<RequestDeduplicator<StatusMap>>,
    ) -> Self {
        Self {
            field_resolver,
            collection_resolver,
            requests,
        }
    }

    /// Builds a manager over the two store-backed resolvers.
    pub fn from_store(
        store: Arc<dyn DataStore>,
        requests: Arc<RequestDeduplicator<StatusMap>>,
    ) -> Self {
        Self::new(
            Arc::new(FieldStatusResolver::new(store.clone())),
            Arc::new(CollectionStatusResolver::new(store)),
            requests,
        )
    }

    async fn fetch_track(
        &self,
        resolver: &Arc<dyn StatusResolverTrait>,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> StatusMap {
        let key = request_key(resolver.as_ref(), ids, period);
        let resolver = resolver.clone();
        let ids = ids.clone();
        match self
            .requests
            .execute(&key, move || async move {
                Ok(Arc::new(resolver.fetch_many(&ids, period).await))
            })
            .await
        {
            Ok(statuses) => statuses,
            Err(e) => {
                warn!("Status request '{}' failed: {}", key, e);
                Arc::new(HashMap::new())
            }
        }
    }

    /// Merges both tracks and reports, per id, which rule decided.
    pub async fn merge_detailed(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, MergedStatus> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let (field, collection) = futures::join!(
            self.fetch_track(&self.field_resolver, ids, period),
            self.fetch_track(&self.collection_resolver, ids, period),
        );
        debug!(
            "Merging {} field and {} collection status(es) for {} application(s)",
            field.len(),
            collection.len(),
            ids.len()
        );

        ids.iter()
            .map(|id| {
                let field_status = field.get(id).copied();
                let collection_status = collection.get(id).copied();
                let (status, origin) = resolve_status(field_status, collection_status);
                (
                    id.clone(),
                    MergedStatus {
                        status,
                        origin,
                        field_status,
                        collection_status,
                    },
                )
            })
            .collect()
    }

    pub async fn merge(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, CollectionStatus> {
        self.merge_detailed(ids, period)
            .await
            .into_iter()
            .map(|(id, merged)| (id, merged.status))
            .collect()
    }
}
