//! Realtime module - routes data store changes to mounted views.

mod change_router;
mod realtime_model;

pub use change_router::ChangeNotificationRouter;
pub use realtime_model::{
    ChangeKind, ChangeListener, MockChangeListener, RefreshTrigger, RouterOptions, RouterState,
};
