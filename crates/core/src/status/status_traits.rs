use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::status_model::{CollectionStatus, StatusSource};
use crate::utils::Period;

/// Fetches the current status of one track for a set of applications.
///
/// Implementations never fail: data-source errors are logged and yield an
/// empty map, so a merge can always use whatever the other track returned.
#[async_trait]
pub trait StatusResolverTrait: Send + Sync {
    fn source(&self) -> StatusSource;

    async fn fetch_many(
        &self,
        ids: &HashSet<String>,
        period: Option<Period>,
    ) -> HashMap<String, CollectionStatus>;
}
