//! Filters module - cascading multi-dimension filtering.

mod filter_engine;
mod filters_model;

pub use filter_engine::FilterEngine;
pub use filters_model::{FilterCriteria, FilterDimension, FilterOutcome, Filterable};
