//! Staff entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::StaffRole;
use super::status::StaffStatus;

/// A staff principal this core issues credentials for.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    /// Unique staff identifier.
    pub id: Uuid,
    /// Unique login email.
    pub email: String,
    /// Human-readable full name.
    pub full_name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Staff role.
    pub role: StaffRole,
    /// Account status.
    pub status: StaffStatus,
    /// Number of consecutive failed login attempts.
    pub failed_login_attempts: i32,
    /// Account locked until this time, if a lockout is in effect.
    ///
    /// Lockout is purely temporal: an expired value means the account is
    /// usable again without any unlocking write.
    pub locked_until: Option<DateTime<Utc>>,
    /// Last successful login time.
    pub last_login_at: Option<DateTime<Utc>>,
    /// When the password was last changed.
    pub last_password_change_at: Option<DateTime<Utc>>,
    /// When the staff member was created.
    pub created_at: DateTime<Utc>,
    /// When the staff member was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// Check whether the account is locked as of `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Check whether the account status permits logging in at all.
    ///
    /// Lockout is checked separately so callers can report the unlock time.
    pub fn can_authenticate(&self) -> bool {
        self.status == StaffStatus::Active
    }
}

/// Snapshot of the lockout counters after an atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStatus {
    /// Consecutive failed attempts after the update.
    pub failed_attempts: i32,
    /// Lock expiry, if the update left the account locked.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    /// Whether the account is locked as of `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn staff_with_lock(locked_until: Option<DateTime<Utc>>) -> Staff {
        let now = Utc::now();
        Staff {
            id: Uuid::new_v4(),
            email: "agent@tourhub.test".into(),
            full_name: "Test Agent".into(),
            password_hash: "x".into(),
            role: StaffRole::Agent,
            status: StaffStatus::Active,
            failed_login_attempts: 0,
            locked_until,
            last_login_at: None,
            last_password_change_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lock_is_temporal() {
        let now = Utc::now();
        let staff = staff_with_lock(Some(now + Duration::hours(1)));
        assert!(staff.is_locked_at(now));
        assert!(!staff.is_locked_at(now + Duration::hours(2)));

        let unlocked = staff_with_lock(None);
        assert!(!unlocked.is_locked_at(now));
    }
}
