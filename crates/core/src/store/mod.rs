//! Data store boundary - query types, the `DataStore` trait and an in-memory implementation.

mod batched;
mod memory_store;
mod store_model;
mod store_traits;

pub use batched::select_for_ids;
pub use memory_store::InMemoryDataStore;
pub use store_model::{
    decode_row, decode_rows, encode_row, ChangeEvent, ChangeEventType, ChangeStream, OrderBy, Row,
    RowFilter, SelectQuery,
};
pub use store_traits::DataStore;
