use async_trait::async_trait;

use super::store_model::{ChangeEventType, ChangeStream, Row, SelectQuery};
use crate::errors::Result;

/// Trait for the hosted relational store the core reads from and writes to.
///
/// The store is an external collaborator: connection management, retries and
/// reconnects of the change channel belong to its client, not to the core.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Runs a filtered, ordered row query.
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>>;

    /// Inserts a row and returns it as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Inserts or replaces the row matching `conflict_keys` and returns it as stored.
    async fn upsert(&self, table: &str, row: Row, conflict_keys: &[&str]) -> Result<Row>;

    /// Subscribes to changes on `table`. Dropping the stream unsubscribes.
    fn subscribe(&self, table: &str, event_types: &[ChangeEventType]) -> Result<ChangeStream>;
}
