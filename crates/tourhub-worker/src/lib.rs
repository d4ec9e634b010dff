//! # tourhub-worker
//!
//! Periodic maintenance for the authentication core: expired-record
//! cleanup, blacklist pruning, and the anomaly scan. Jobs are
//! idempotent, catch their own failures, and never crash the scheduler.

pub mod jobs;
pub mod scheduler;

pub use scheduler::MaintenanceScheduler;
