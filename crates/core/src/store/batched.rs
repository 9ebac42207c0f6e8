use std::collections::HashSet;

use super::store_model::{Row, SelectQuery};
use super::store_traits::DataStore;
use crate::constants::IN_QUERY_CHUNK_SIZE;
use crate::errors::Result;

/// Runs `query` restricted to `ids`, splitting large id sets into several
/// `IN` queries. Ids are sorted first so chunking is deterministic; rows for
/// one id always come from a single chunk and keep the store's ordering.
pub async fn select_for_ids(
    store: &dyn DataStore,
    query: SelectQuery,
    column: &str,
    ids: &HashSet<String>,
) -> Result<Vec<Row>> {
    let mut sorted: Vec<&String> = ids.iter().collect();
    sorted.sort();

    let mut rows = Vec::new();
    for chunk in sorted.chunks(IN_QUERY_CHUNK_SIZE) {
        let chunk_query = query
            .clone()
            .in_list(column, chunk.iter().map(|id| id.to_string()));
        rows.extend(store.select(chunk_query).await?);
    }
    Ok(rows)
}
