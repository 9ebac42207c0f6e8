//! Analytics module - collection totals grouped by a filter dimension.

mod analytics_model;
mod analytics_service;

pub use analytics_model::{CollectionSummary, GroupSummary};
pub use analytics_service::{build_summary, summarize, summarize_by, OVERALL_GROUP};
