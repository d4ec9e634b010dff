//! Failed-login counting and temporary account lockout.

use std::sync::Arc;

use chrono::Duration;
use tracing::warn;
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::AuthConfig;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::StaffRepository;
use tourhub_entity::staff::{LockoutStatus, Staff};

/// Tracks failed logins per principal and locks atomically.
///
/// Counting happens inside a single store statement, never as a
/// read-then-write in process memory: two concurrent failed logins must
/// both be counted.
#[derive(Debug, Clone)]
pub struct LockoutGuard {
    /// Staff persistence.
    repo: Arc<dyn StaffRepository>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Failures required to trigger a lock.
    threshold: i32,
    /// How long a lock lasts.
    duration: Duration,
}

impl LockoutGuard {
    /// Creates a new guard from auth configuration.
    pub fn new(repo: Arc<dyn StaffRepository>, clock: Arc<dyn Clock>, config: &AuthConfig) -> Self {
        Self {
            repo,
            clock,
            threshold: config.max_failed_attempts,
            duration: config.lockout_duration(),
        }
    }

    /// Whether the account is currently locked.
    pub fn is_locked(&self, staff: &Staff) -> bool {
        staff.is_locked_at(self.clock.now())
    }

    /// Registers a failed login attempt.
    ///
    /// An expired lock restarts the counter at 1; otherwise the counter
    /// increments, and reaching the threshold sets the lock. All of it
    /// happens in one atomic store operation.
    pub async fn record_failure(&self, staff_id: Uuid) -> AppResult<LockoutStatus> {
        let now = self.clock.now();
        let status = self
            .repo
            .record_failed_attempt(staff_id, now, self.threshold, now + self.duration)
            .await?;

        if let Some(locked_until) = status.locked_until {
            if locked_until > now {
                warn!(
                    target: "audit",
                    principal_id = %staff_id,
                    attempts = status.failed_attempts,
                    locked_until = %locked_until,
                    "Account locked after repeated failed logins"
                );
            }
        }

        Ok(status)
    }

    /// Clears the failure counter and lock after a successful login,
    /// stamping the login time.
    pub async fn record_success(&self, staff_id: Uuid) -> AppResult<()> {
        self.repo.clear_lockout(staff_id, self.clock.now()).await
    }
}
