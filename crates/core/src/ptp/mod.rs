//! Promise-to-pay module - latest promise per application and date buckets.

mod ptp_model;
mod ptp_service;

pub use ptp_model::{NewPtpRecord, PtpBucket, PtpRecord};
pub use ptp_service::PtpService;
