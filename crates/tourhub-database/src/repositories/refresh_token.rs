//! Refresh token repository: hash lookups, revocation, and the
//! rotation compare-and-swap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tourhub_core::error::{AppError, ErrorKind};
use tourhub_core::result::AppResult;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::token::{
    IpCreationCount, NewRefreshToken, PrincipalRevocationCount, RefreshTokenRecord,
    RevocationReason,
};

/// Persistence operations for refresh credentials.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new refresh credential and return the stored record.
    async fn insert(&self, data: &NewRefreshToken) -> AppResult<RefreshTokenRecord>;

    /// Find a non-revoked, non-expired record by its secret hash.
    async fn find_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>>;

    /// Bump the usage counter and last-used time.
    async fn touch_usage(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()>;

    /// Revoke a record. Idempotent: revoking an already-revoked record
    /// affects zero rows and is still a success.
    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Bulk-revoke every non-revoked record for a principal. Returns the
    /// number of records flipped.
    async fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Compare-and-swap claim for rotation: revoke the record only if it
    /// is still unrevoked, returning the claimed row. Exactly one of any
    /// number of concurrent callers gets `Some`; the rest get `None`.
    async fn claim_for_rotation(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>>;

    /// Delete expired records and revoked records older than the
    /// retention cutoff. Safe to run with nothing to delete.
    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// IPs that created at least `min_count` records since `since`.
    async fn creation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<IpCreationCount>>;

    /// Principals with at least `min_count` security-reason revocations
    /// since `since`.
    async fn security_revocation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<PrincipalRevocationCount>>;

    /// Live records whose usage count is at or above `min_usage`.
    async fn find_high_usage(&self, min_usage: i32) -> AppResult<Vec<RefreshTokenRecord>>;
}

/// PostgreSQL implementation of [`RefreshTokenRepository`].
#[derive(Debug, Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    /// Create a new refresh token repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(&self, data: &NewRefreshToken) -> AppResult<RefreshTokenRecord> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "INSERT INTO refresh_tokens \
                 (token_hash, principal_id, principal_type, device_info, ip_address, \
                  expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(&data.token_hash)
        .bind(data.principal_id)
        .bind(data.principal_type)
        .bind(&data.device_info)
        .bind(&data.ip_address)
        .bind(data.expires_at)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create refresh token", e)
        })
    }

    async fn find_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens \
             WHERE token_hash = $1 AND revoked = FALSE AND expires_at > $2",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find refresh token", e)
        })
    }

    async fn touch_usage(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET usage_count = usage_count + 1, last_used_at = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update usage count", e)
        })?;
        Ok(())
    }

    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens \
             SET revoked = TRUE, revoked_at = $2, revoked_reason = $3 \
             WHERE id = $1 AND revoked = FALSE",
        )
        .bind(id)
        .bind(now)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to revoke refresh token", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens \
             SET revoked = TRUE, revoked_at = $3, revoked_reason = $4 \
             WHERE principal_id = $1 AND principal_type = $2 AND revoked = FALSE",
        )
        .bind(principal_id)
        .bind(principal_type)
        .bind(now)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to revoke principal refresh tokens",
                e,
            )
        })?;

        Ok(result.rows_affected())
    }

    async fn claim_for_rotation(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        // The WHERE clause is the race arbiter: only the caller whose
        // update matches the unrevoked row gets it back.
        sqlx::query_as::<_, RefreshTokenRecord>(
            "UPDATE refresh_tokens \
             SET revoked = TRUE, revoked_at = $2, revoked_reason = $3, \
                 usage_count = usage_count + 1, last_used_at = $2 \
             WHERE id = $1 AND revoked = FALSE \
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .bind(RevocationReason::Rotated.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to claim token for rotation", e)
        })
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens \
             WHERE expires_at < $1 OR (revoked = TRUE AND revoked_at < $2)",
        )
        .bind(now)
        .bind(revoked_before)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to cleanup refresh tokens", e)
        })?;

        Ok(result.rows_affected())
    }

    async fn creation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<IpCreationCount>> {
        sqlx::query_as::<_, IpCreationCount>(
            "SELECT ip_address, COUNT(*) AS created FROM refresh_tokens \
             WHERE created_at >= $1 AND ip_address IS NOT NULL \
             GROUP BY ip_address HAVING COUNT(*) >= $2 \
             ORDER BY created DESC",
        )
        .bind(since)
        .bind(min_count)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan creation hotspots", e)
        })
    }

    async fn security_revocation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<PrincipalRevocationCount>> {
        let reasons: Vec<String> = RevocationReason::SECURITY
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();

        sqlx::query_as::<_, PrincipalRevocationCount>(
            "SELECT principal_id, COUNT(*) AS revoked FROM refresh_tokens \
             WHERE revoked_at >= $1 AND revoked_reason = ANY($2) \
             GROUP BY principal_id HAVING COUNT(*) >= $3 \
             ORDER BY revoked DESC",
        )
        .bind(since)
        .bind(&reasons)
        .bind(min_count)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan revocation hotspots", e)
        })
    }

    async fn find_high_usage(&self, min_usage: i32) -> AppResult<Vec<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens \
             WHERE usage_count >= $1 AND revoked = FALSE \
             ORDER BY usage_count DESC",
        )
        .bind(min_usage)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan high-usage tokens", e)
        })
    }
}
