//! Session lifecycle orchestration.

pub mod coordinator;

pub use coordinator::{
    LoginOutcome, LogoutAllSummary, LogoutSummary, RefreshOutcome, SessionLifecycleCoordinator,
};
