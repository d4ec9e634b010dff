//! Staff repository: lookups and atomic lockout/credential mutations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tourhub_core::error::{AppError, ErrorKind};
use tourhub_core::result::AppResult;
use tourhub_entity::staff::{LockoutStatus, Staff, StaffRole};

/// Persistence operations for staff principals.
///
/// The lockout mutations are single conditional statements: two
/// concurrent failed logins must both be counted, so counting is never
/// read-then-write in process memory.
#[async_trait]
pub trait StaffRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Find a staff member by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Staff>>;

    /// Find a staff member by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>>;

    /// Atomically register a failed login attempt.
    ///
    /// In one statement: a lock that has already expired resets the
    /// counter to 1 (and clears the stale lock); otherwise the counter
    /// increments; when the new count reaches `threshold` and no live
    /// lock exists, `locked_until` is set to `lock_until`. Returns the
    /// resulting counters.
    async fn record_failed_attempt(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<LockoutStatus>;

    /// Atomically clear the failure counter and lock, stamping the
    /// successful login time.
    async fn clear_lockout(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Replace the password hash and stamp the change time.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Update a staff member's role, returning the updated row.
    async fn update_role(&self, id: Uuid, role: StaffRole) -> AppResult<Staff>;
}

/// PostgreSQL implementation of [`StaffRepository`].
#[derive(Debug, Clone)]
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    /// Create a new staff repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Staff>> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find staff by id", e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        sqlx::query_as::<_, Staff>("SELECT * FROM staff WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find staff by email", e)
            })
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<LockoutStatus> {
        // Single statement so concurrent failures are all counted. The inner
        // CASE computes the new counter; the outer one derives the lock from
        // it without a second round trip.
        let row: (i32, Option<DateTime<Utc>>) = sqlx::query_as(
            "UPDATE staff SET \
                 failed_login_attempts = CASE \
                     WHEN locked_until IS NOT NULL AND locked_until <= $2 THEN 1 \
                     ELSE failed_login_attempts + 1 \
                 END, \
                 locked_until = CASE \
                     WHEN locked_until IS NOT NULL AND locked_until > $2 THEN locked_until \
                     WHEN (CASE \
                         WHEN locked_until IS NOT NULL AND locked_until <= $2 THEN 1 \
                         ELSE failed_login_attempts + 1 \
                     END) >= $3 THEN $4 \
                     ELSE NULL \
                 END, \
                 updated_at = $2 \
             WHERE id = $1 \
             RETURNING failed_login_attempts, locked_until",
        )
        .bind(id)
        .bind(now)
        .bind(threshold)
        .bind(lock_until)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record failed attempt", e)
        })?;

        Ok(LockoutStatus {
            failed_attempts: row.0,
            locked_until: row.1,
        })
    }

    async fn clear_lockout(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE staff SET failed_login_attempts = 0, locked_until = NULL, \
                 last_login_at = $2, updated_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to clear lockout", e))?;
        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE staff SET password_hash = $2, last_password_change_at = $3, updated_at = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update password", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Staff {id} not found")));
        }
        Ok(())
    }

    async fn update_role(&self, id: Uuid, role: StaffRole) -> AppResult<Staff> {
        sqlx::query_as::<_, Staff>(
            "UPDATE staff SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update role", e))?
        .ok_or_else(|| AppError::not_found(format!("Staff {id} not found")))
    }
}
