//! Query and change-notification types shared by every `DataStore`.

use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::{DatabaseError, Result};

/// A row as returned by the hosted store: a JSON object keyed by column.
pub type Row = serde_json::Map<String, Value>;

/// A single predicate on a column.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// A filtered, ordered, optionally paged row query against one table.
///
/// `range` is half-open over the ordered result (`0..50` returns the first
/// fifty rows).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub filters: Vec<RowFilter>,
    pub order: Option<OrderBy>,
    pub range: Option<Range<usize>>,
}

impl SelectQuery {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            order: None,
            range: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(RowFilter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(RowFilter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(RowFilter::IsNull(column.to_string()));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(OrderBy {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    pub fn range(mut self, range: Range<usize>) -> Self {
        self.range = Some(range);
        self
    }
}

/// Kind of row mutation reported by the change channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeEventType {
    Insert,
    Update,
    Delete,
}

impl ChangeEventType {
    pub const ALL: [ChangeEventType; 3] = [
        ChangeEventType::Insert,
        ChangeEventType::Update,
        ChangeEventType::Delete,
    ];
}

/// A row-level change pushed by the data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub event_type: ChangeEventType,
    pub new: Option<Row>,
    pub old: Option<Row>,
}

impl ChangeEvent {
    /// Returns the application the changed row belongs to.
    ///
    /// Looks at `applicant_id`, then `application_id`, on the new row first
    /// and the old row second.
    pub fn subject_id(&self) -> Option<String> {
        [self.new.as_ref(), self.old.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|row| {
                ["applicant_id", "application_id"]
                    .iter()
                    .find_map(|column| match row.get(*column) {
                        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                        Some(Value::Number(n)) => Some(n.to_string()),
                        _ => None,
                    })
            })
    }
}

/// Receiving half of a table subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeStream {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Creates a connected sender/stream pair.
    pub fn channel() -> (mpsc::UnboundedSender<ChangeEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Waits for the next change. Returns None once the store side is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Maps a row into a typed record.
pub fn decode_row<T: DeserializeOwned>(table: &str, row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        DatabaseError::MalformedRow {
            table: table.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Maps a typed record into a row.
pub fn encode_row<T: Serialize>(table: &str, record: &T) -> Result<Row> {
    match serde_json::to_value(record)? {
        Value::Object(row) => Ok(row),
        other => Err(DatabaseError::MalformedRow {
            table: table.to_string(),
            message: format!("expected an object, got {}", other),
        }
        .into()),
    }
}

/// Decodes rows, skipping (and logging) those that do not fit the record type.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode_row(table, row) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping row: {}", e);
                None
            }
        })
        .collect()
}
