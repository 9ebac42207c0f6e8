//! In-memory `DataStore` with change notifications.
//!
//! Used to embed the core without a hosted database and as the backing store
//! in tests. Rows keep insertion order, sorting is stable, and every
//! mutation is pushed to matching subscribers.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::store_model::{ChangeEvent, ChangeEventType, ChangeStream, Row, RowFilter, SelectQuery};
use super::store_traits::DataStore;
use crate::errors::{DatabaseError, Error, Result};
use crate::utils::parse_timestamp;

struct Subscriber {
    table: String,
    event_types: Vec<ChangeEventType>,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
pub struct InMemoryDataStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    subscribers: Mutex<Vec<Subscriber>>,
    failing_tables: RwLock<HashSet<String>>,
    select_calls: AtomicUsize,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads rows without emitting change events.
    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().unwrap();
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Makes every operation on `table` fail until `recover_table` is called.
    pub fn fail_table(&self, table: &str) {
        self.failing_tables.write().unwrap().insert(table.to_string());
    }

    pub fn recover_table(&self, table: &str) {
        self.failing_tables.write().unwrap().remove(table);
    }

    /// Number of `select` calls served so far.
    pub fn select_count(&self) -> usize {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live subscriptions across all tables.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|s| !s.tx.is_closed());
        subscribers.len()
    }

    /// Pushes a change to subscribers as if another client had written it.
    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|s| !s.tx.is_closed());
        for subscriber in subscribers.iter() {
            if subscriber.table == event.table && subscriber.event_types.contains(&event.event_type)
            {
                let _ = subscriber.tx.send(event.clone());
            }
        }
    }

    fn ensure_available(&self, table: &str) -> Result<()> {
        if self.failing_tables.read().unwrap().contains(table) {
            return Err(DatabaseError::QueryFailed(format!("table '{}' is unavailable", table)).into());
        }
        Ok(())
    }

    fn insert_row(&self, table: &str, mut row: Row) -> Row {
        if !row.contains_key("id") {
            row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }
}

fn matches_filter(row: &Row, filter: &RowFilter) -> bool {
    match filter {
        RowFilter::Eq(column, expected) => match row.get(column) {
            Some(actual) => actual == expected,
            None => expected.is_null(),
        },
        RowFilter::In(column, accepted) => row
            .get(column)
            .map(|actual| accepted.contains(actual))
            .unwrap_or(false),
        RowFilter::IsNull(column) => row.get(column).map(Value::is_null).unwrap_or(true),
    }
}

/// Orders two column values. Missing or null values always sort last.
/// Present values are grouped by kind (booleans, numbers, timestamp strings,
/// other strings, anything else) so mixed columns still sort totally.
/// Timestamps compare chronologically; equal instants keep insertion order.
fn compare_values(a: Option<&Value>, b: Option<&Value>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    let ordering = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(x), Some(y)) => compare_present(x, y),
    };
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(text) if parse_timestamp(text).is_some() => 2,
        Value::String(_) => 3,
        _ => 4,
    }
}

fn compare_present(x: &Value, y: &Value) -> Ordering {
    kind_rank(x).cmp(&kind_rank(y)).then_with(|| match (x, y) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&y.as_f64().unwrap_or_default()),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => x.to_string().cmp(&y.to_string()),
    })
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.ensure_available(&query.table)?;

        let mut rows: Vec<Row> = self
            .tables
            .read()
            .unwrap()
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                compare_values(a.get(&order.column), b.get(&order.column), order.descending)
            });
        }

        if let Some(range) = query.range {
            rows = rows
                .into_iter()
                .skip(range.start)
                .take(range.end.saturating_sub(range.start))
                .collect();
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.ensure_available(table)?;
        let stored = self.insert_row(table, row);
        self.publish(ChangeEvent {
            table: table.to_string(),
            event_type: ChangeEventType::Insert,
            new: Some(stored.clone()),
            old: None,
        });
        Ok(stored)
    }

    async fn upsert(&self, table: &str, row: Row, conflict_keys: &[&str]) -> Result<Row> {
        self.ensure_available(table)?;
        if conflict_keys.is_empty() {
            return Err(Error::Unexpected(
                "upsert requires at least one conflict key".to_string(),
            ));
        }

        let replaced = {
            let mut tables = self.tables.write().unwrap();
            let rows = tables.entry(table.to_string()).or_default();
            rows.iter_mut()
                .find(|existing| {
                    conflict_keys
                        .iter()
                        .all(|key| existing.get(*key) == row.get(*key))
                })
                .map(|existing| {
                    let old = existing.clone();
                    for (column, value) in row.iter() {
                        if column != "id" {
                            existing.insert(column.clone(), value.clone());
                        }
                    }
                    (old, existing.clone())
                })
        };

        match replaced {
            Some((old, new)) => {
                self.publish(ChangeEvent {
                    table: table.to_string(),
                    event_type: ChangeEventType::Update,
                    new: Some(new.clone()),
                    old: Some(old),
                });
                Ok(new)
            }
            None => self.insert(table, row).await,
        }
    }

    fn subscribe(&self, table: &str, event_types: &[ChangeEventType]) -> Result<ChangeStream> {
        if self.failing_tables.read().unwrap().contains(table) {
            return Err(DatabaseError::SubscriptionFailed(table.to_string()).into());
        }
        let (tx, stream) = ChangeStream::channel();
        self.subscribers.lock().unwrap().push(Subscriber {
            table: table.to_string(),
            event_types: event_types.to_vec(),
            tx,
        });
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn seeded() -> InMemoryDataStore {
        let store = InMemoryDataStore::new();
        store.seed(
            "field_status",
            vec![
                row(json!({ "application_id": "A", "status": "Unpaid", "created_at": "2025-07-01T09:00:00Z" })),
                row(json!({ "application_id": "B", "status": "Paid", "created_at": "2025-07-03T09:00:00Z" })),
                row(json!({ "application_id": "A", "status": "Paid", "created_at": "2025-07-02T09:00:00.5Z" })),
                row(json!({ "application_id": "C", "status": null, "created_at": null })),
            ],
        );
        store
    }

    #[tokio::test]
    async fn test_select_filters_and_orders_timestamps_chronologically() {
        let store = seeded();
        let rows = store
            .select(
                SelectQuery::from("field_status")
                    .in_list("application_id", ["A", "B"])
                    .order_desc("created_at"),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = rows
            .iter()
            .map(|r| r["application_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["B", "A", "A"]);
        assert_eq!(rows[1]["status"], json!("Paid"));
        assert_eq!(store.select_count(), 1);
    }

    #[tokio::test]
    async fn test_nulls_sort_last_and_range_pages() {
        let store = seeded();
        let rows = store
            .select(SelectQuery::from("field_status").order_asc("created_at").range(2..4))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["application_id"], json!("C"));
    }

    #[tokio::test]
    async fn test_mixed_column_sorts_timestamps_before_text() {
        let store = InMemoryDataStore::new();
        let values = [
            json!("2025-07-03T09:00:00Z"),
            json!("pending"),
            json!("2025-07-01T09:00:00Z"),
            json!("2025-06-30"),
            json!(7),
            json!("2025-07-01T11:00:00+02:00"),
            json!("abc"),
            json!(null),
            json!("2025-07-02 09:00:00"),
        ];
        store.seed(
            "mixed",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| row(json!({ "n": i, "at": v })))
                .collect(),
        );

        let rows = store
            .select(SelectQuery::from("mixed").order_asc("at"))
            .await
            .unwrap();
        let order: Vec<u64> = rows.iter().map(|r| r["n"].as_u64().unwrap()).collect();
        // Number, then timestamps by instant (equal instants in insertion
        // order), then plain text, then null.
        assert_eq!(order, vec![4, 2, 5, 8, 0, 3, 6, 1, 7]);
    }

    #[tokio::test]
    async fn test_is_null_filter() {
        let store = seeded();
        let rows = store
            .select(SelectQuery::from("field_status").is_null("status"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_notifies() {
        let store = InMemoryDataStore::new();
        let mut stream = store
            .subscribe("comments", &[ChangeEventType::Insert])
            .unwrap();
        let stored = store
            .insert("comments", row(json!({ "application_id": "A", "content": "hi" })))
            .await
            .unwrap();
        assert!(stored.contains_key("id"));

        let event = stream.recv().await.unwrap();
        assert_eq!(event.event_type, ChangeEventType::Insert);
        assert_eq!(event.subject_id().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_on_conflict() {
        let store = InMemoryDataStore::new();
        let mut stream = store
            .subscribe("profiles", &ChangeEventType::ALL)
            .unwrap();
        store
            .upsert("profiles", row(json!({ "id": "u1", "full_name": "Old" })), &["id"])
            .await
            .unwrap();
        store
            .upsert("profiles", row(json!({ "id": "u1", "full_name": "New" })), &["id"])
            .await
            .unwrap();

        let rows = store.rows("profiles");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["full_name"], json!("New"));

        assert_eq!(stream.recv().await.unwrap().event_type, ChangeEventType::Insert);
        let update = stream.recv().await.unwrap();
        assert_eq!(update.event_type, ChangeEventType::Update);
        assert_eq!(update.old.unwrap()["full_name"], json!("Old"));
    }

    #[tokio::test]
    async fn test_failing_table_errors() {
        let store = seeded();
        store.fail_table("field_status");
        assert!(store.select(SelectQuery::from("field_status")).await.is_err());
        assert!(store.subscribe("field_status", &ChangeEventType::ALL).is_err());
        store.recover_table("field_status");
        assert!(store.select(SelectQuery::from("field_status")).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_stream_unsubscribes() {
        let store = InMemoryDataStore::new();
        let stream = store.subscribe("comments", &ChangeEventType::ALL).unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(stream);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_type_filtering() {
        let store = InMemoryDataStore::new();
        let mut stream = store.subscribe("profiles", &[ChangeEventType::Update]).unwrap();
        store
            .upsert("profiles", row(json!({ "id": "u1", "full_name": "A" })), &["id"])
            .await
            .unwrap();
        store
            .upsert("profiles", row(json!({ "id": "u1", "full_name": "B" })), &["id"])
            .await
            .unwrap();
        let event = stream.recv().await.unwrap();
        assert_eq!(event.event_type, ChangeEventType::Update);
    }
}
