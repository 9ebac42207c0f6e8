//! Status module - the two status tracks, their resolvers and the merger.

mod status_merger;
mod status_model;
mod status_resolvers;
mod status_service;
mod status_traits;

pub use status_merger::{resolve_status, EnhancedStatusManager, StatusMap};
pub use status_model::{
    CollectionStatus, MergedStatus, NewStatusRecord, StatusOrigin, StatusRecord, StatusSource,
};
pub use status_resolvers::{CollectionStatusResolver, FieldStatusResolver};
pub use status_service::FieldStatusService;
pub use status_traits::StatusResolverTrait;
