//! Applications module - the loan applications worked by the collections team.

mod applications_model;
mod applications_service;

pub use applications_model::{
    parse_amount, Application, FailedRecord, ImportSummary, NewApplication,
};
pub use applications_service::ApplicationService;
