//! Request deduplication for concurrent identical fetches.

mod request_deduplicator;

pub use request_deduplicator::RequestDeduplicator;
