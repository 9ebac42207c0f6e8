//! Calling status module - outbound call outcomes per contact role.

mod calling_model;
mod calling_service;

pub use calling_model::{
    CallingStatusRecord, CallingSummary, ContactRole, NewCallingStatusRecord,
};
pub use calling_service::CallingStatusService;
