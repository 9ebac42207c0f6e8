//! LoanTrack Core - collections tracking for loan applications.
//!
//! Reconciles the field and collection status tracks, resolves
//! promise-to-pay and calling state, routes data store changes to mounted
//! boards and filters board rows. Storage sits behind the `DataStore`
//! trait; `InMemoryDataStore` is provided for embedding and tests.

pub mod analytics;
pub mod applications;
pub mod audit;
pub mod board;
pub mod calling;
pub mod comments;
pub mod constants;
pub mod dedup;
pub mod errors;
pub mod filters;
pub mod import;
pub mod profiles;
pub mod ptp;
pub mod realtime;
pub mod settings;
pub mod status;
pub mod store;
pub mod utils;

pub use board::{ApplicationBoard, ApplicationRow};
pub use store::{DataStore, InMemoryDataStore};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
