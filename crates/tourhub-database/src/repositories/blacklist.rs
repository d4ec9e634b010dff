//! Token blacklist repository: revoked-token rows and principal-wide
//! revocation sentinels.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tourhub_core::error::{AppError, ErrorKind};
use tourhub_core::result::AppResult;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::token::{BlacklistEntry, BlacklistKind, NewBlacklistEntry};

/// Persistence operations for the access-token blacklist.
#[async_trait]
pub trait BlacklistRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new blacklist entry.
    async fn insert(&self, entry: &NewBlacklistEntry) -> AppResult<BlacklistEntry>;

    /// Whether a live token row exists for the given hash.
    async fn exists_token_hash(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool>;

    /// Creation time of the newest live sentinel for a principal, if any.
    async fn latest_sentinel_at(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>>;

    /// Delete rows past their expiry. Safe to run with nothing to delete.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Delete rows created before the cutoff, regardless of expiry.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// PostgreSQL implementation of [`BlacklistRepository`].
#[derive(Debug, Clone)]
pub struct PgBlacklistRepository {
    pool: PgPool,
}

impl PgBlacklistRepository {
    /// Create a new blacklist repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistRepository for PgBlacklistRepository {
    async fn insert(&self, entry: &NewBlacklistEntry) -> AppResult<BlacklistEntry> {
        sqlx::query_as::<_, BlacklistEntry>(
            "INSERT INTO token_blacklist \
                 (kind, token_hash, jti, principal_id, principal_type, expires_at, reason, \
                  created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING *",
        )
        .bind(entry.kind)
        .bind(&entry.token_hash)
        .bind(entry.jti)
        .bind(entry.principal_id)
        .bind(entry.principal_type)
        .bind(entry.expires_at)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create blacklist entry", e)
        })
    }

    async fn exists_token_hash(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(\
                 SELECT 1 FROM token_blacklist \
                 WHERE kind = $1 AND token_hash = $2 AND expires_at > $3\
             )",
        )
        .bind(BlacklistKind::Token)
        .bind(token_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check blacklist", e))?;

        Ok(exists)
    }

    async fn latest_sentinel_at(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        sqlx::query_scalar(
            "SELECT MAX(created_at) FROM token_blacklist \
             WHERE kind = $1 AND principal_id = $2 AND principal_type = $3 AND expires_at > $4",
        )
        .bind(BlacklistKind::Sentinel)
        .bind(principal_id)
        .bind(principal_type)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to query sentinel", e)
        })
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to cleanup blacklist", e)
            })?;

        Ok(result.rows_affected())
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to prune blacklist", e)
            })?;

        Ok(result.rows_affected())
    }
}
