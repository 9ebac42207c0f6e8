//! Memoized user id → display name resolution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{PROFILES_TABLE, UNKNOWN_USER_NAME};
use crate::store::{decode_rows, DataStore, SelectQuery};

/// A row of the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Profile {
    /// Full name if present, else the local part of the email, else the fallback literal.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.full_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        if let Some(local) = self
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .map(str::trim)
        {
            if !local.is_empty() {
                return local.to_string();
            }
        }
        UNKNOWN_USER_NAME.to_string()
    }
}

/// Caches resolved display names for the lifetime of a mounted view.
///
/// Names are immutable once fetched, so concurrent population of the same id
/// is harmless. Ids without a profile row, and lookups that fail, resolve to
/// the fallback literal and are not cached.
pub struct ProfileCache {
    store: Arc<dyn DataStore>,
    names: DashMap<String, String>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            names: DashMap::new(),
        }
    }

    pub async fn resolve(&self, user_id: &str) -> String {
        let ids = HashSet::from([user_id.to_string()]);
        self.resolve_many(&ids)
            .await
            .remove(user_id)
            .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string())
    }

    /// Resolves every id, fetching all cache misses in one query.
    pub async fn resolve_many(&self, user_ids: &HashSet<String>) -> HashMap<String, String> {
        let mut resolved = HashMap::with_capacity(user_ids.len());
        let mut missing = Vec::new();

        for id in user_ids {
            if id.is_empty() {
                resolved.insert(id.clone(), UNKNOWN_USER_NAME.to_string());
            } else if let Some(name) = self.names.get(id) {
                resolved.insert(id.clone(), name.value().clone());
            } else {
                missing.push(id.clone());
            }
        }

        if !missing.is_empty() {
            debug!("Resolving {} uncached profile(s)", missing.len());
            match self
                .store
                .select(SelectQuery::from(PROFILES_TABLE).in_list("id", missing.clone()))
                .await
            {
                Ok(rows) => {
                    for profile in decode_rows::<Profile>(PROFILES_TABLE, rows) {
                        let name = profile.display_name();
                        self.names.insert(profile.id.clone(), name.clone());
                        resolved.insert(profile.id, name);
                    }
                }
                Err(e) => warn!("Failed to load profiles: {}", e),
            }
            for id in missing {
                resolved
                    .entry(id)
                    .or_insert_with(|| UNKNOWN_USER_NAME.to_string());
            }
        }

        resolved
    }

    pub fn cached_len(&self) -> usize {
        self.names.len()
    }

    pub fn clear(&self) {
        self.names.clear();
    }
}
