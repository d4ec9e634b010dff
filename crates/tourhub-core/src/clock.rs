//! Wall-clock abstraction.
//!
//! All time-dependent components (token issuance, lockout windows,
//! permission cache TTLs, cleanup cutoffs) take an `Arc<dyn Clock>` so
//! tests can drive time explicitly instead of sleeping.

use chrono::{DateTime, Utc};

/// Source of the current UTC wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
