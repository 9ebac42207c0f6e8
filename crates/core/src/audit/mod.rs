//! Audit log module - append-only change history per application.

mod audit_model;
mod audit_service;

pub use audit_model::{audit_fields, AuditLogEntry, AuditLogView, NewAuditLogEntry};
pub use audit_service::AuditLogService;
