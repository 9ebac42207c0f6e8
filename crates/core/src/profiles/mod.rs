//! Profiles module - display-name resolution for actors.

mod profile_cache;

pub use profile_cache::{Profile, ProfileCache};
