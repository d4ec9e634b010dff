//! Time-bounded permission caching for authorization decisions.

pub mod cache;
pub mod source;

pub use cache::PermissionCache;
pub use source::{PermissionSource, StaffPermissionSource};
