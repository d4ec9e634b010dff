//! Maintenance job implementations.

pub mod anomaly;
pub mod cleanup;

pub use anomaly::AnomalyScan;
pub use cleanup::CleanupJob;
