//! Refresh credential operations over the persistence seam.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::AuthConfig;
use tourhub_core::error::AppError;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::RefreshTokenRepository;
use tourhub_entity::device::DeviceInfo;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::token::{NewRefreshToken, RefreshTokenRecord, RevocationReason};

use crate::digest::sha256_hex;

/// Entropy of a refresh secret before encoding, in bytes.
const SECRET_BYTES: usize = 32;

/// A freshly minted refresh credential.
///
/// `secret` is the only copy of the plaintext; the record holds its hash.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// The opaque secret handed to the client.
    pub secret: String,
    /// The persisted record.
    pub record: RefreshTokenRecord,
}

/// Persists hashed opaque refresh secrets and their lifecycle.
#[derive(Debug, Clone)]
pub struct RefreshTokenStore {
    /// Refresh token persistence.
    repo: Arc<dyn RefreshTokenRepository>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Credential lifetime.
    lifetime: Duration,
    /// Retention window for revoked records before cleanup deletes them.
    revoked_retention: Duration,
}

impl RefreshTokenStore {
    /// Creates a new store over the given repository.
    pub fn new(
        repo: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            lifetime: config.refresh_lifetime(),
            revoked_retention: config.revoked_retention(),
        }
    }

    /// Generates a high-entropy secret and persists its hash plus metadata.
    pub async fn create(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        device: &DeviceInfo,
    ) -> AppResult<IssuedRefreshToken> {
        let secret = generate_secret();
        let now = self.clock.now();

        let record = self
            .repo
            .insert(&NewRefreshToken {
                token_hash: sha256_hex(&secret),
                principal_id,
                principal_type,
                device_info: Some(device.to_value()),
                ip_address: device.ip_address.clone(),
                expires_at: now + self.lifetime,
                created_at: now,
            })
            .await?;

        Ok(IssuedRefreshToken { secret, record })
    }

    /// Looks up the record for a presented secret; `None` unless it is
    /// both non-revoked and non-expired.
    pub async fn find_valid(&self, secret: &str) -> AppResult<Option<RefreshTokenRecord>> {
        self.repo
            .find_valid_by_hash(&sha256_hex(secret), self.clock.now())
            .await
    }

    /// Bumps the usage counter on a non-rotating exchange.
    pub async fn touch_usage(&self, id: Uuid) -> AppResult<()> {
        self.repo.touch_usage(id, self.clock.now()).await
    }

    /// Revokes a record. Idempotent: revoking twice is a no-op, and
    /// revocation is monotonic — a revoked record is never un-revoked.
    pub async fn revoke(&self, id: Uuid, reason: RevocationReason) -> AppResult<()> {
        let flipped = self.repo.revoke(id, reason, self.clock.now()).await?;
        if flipped > 0 {
            info!(
                target: "audit",
                record_id = %id,
                reason = %reason,
                "Refresh token revoked"
            );
        }
        Ok(())
    }

    /// Bulk-revokes every outstanding record for a principal.
    pub async fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
    ) -> AppResult<u64> {
        let revoked = self
            .repo
            .revoke_all_for_principal(principal_id, principal_type, reason, self.clock.now())
            .await?;

        info!(
            target: "audit",
            principal_id = %principal_id,
            principal_type = %principal_type,
            reason = %reason,
            revoked,
            "Refresh tokens bulk-revoked"
        );

        Ok(revoked)
    }

    /// Atomically rotates a credential: revoke-if-unrevoked, then mint a
    /// replacement for the same principal.
    ///
    /// Of any number of concurrent callers presenting the same secret,
    /// exactly one wins the conditional update and proceeds to `create`;
    /// the rest fail with `RefreshTokenInvalid`.
    pub async fn rotate(
        &self,
        record: &RefreshTokenRecord,
        device: &DeviceInfo,
    ) -> AppResult<IssuedRefreshToken> {
        let claimed = self
            .repo
            .claim_for_rotation(record.id, self.clock.now())
            .await?;

        let Some(claimed) = claimed else {
            return Err(AppError::refresh_token_invalid(
                "Refresh token was already rotated or revoked",
            ));
        };

        self.create(claimed.principal_id, claimed.principal_type, device)
            .await
    }

    /// Deletes expired records and revoked records past the retention
    /// window. Returns the number removed; zero is a successful no-op.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let now = self.clock.now();
        self.repo
            .delete_expired(now, now - self.revoked_retention)
            .await
    }
}

/// URL-safe, unpadded base64 encoding of 32 random bytes.
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use tourhub_core::error::ErrorKind;
    use tourhub_entity::staff::StaffRole;

    use crate::testing::TestHarness;

    use super::*;

    #[test]
    fn test_generated_secrets_are_unique_and_opaque() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
        // 32 bytes -> 43 unpadded base64 chars.
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }

    #[tokio::test]
    async fn test_create_stores_hash_not_secret() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();

        assert_eq!(issued.record.token_hash, sha256_hex(&issued.secret));
        assert_ne!(issued.record.token_hash, issued.secret);
        assert_eq!(issued.record.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(
            issued.record.expires_at,
            issued.record.created_at + Duration::days(30)
        );
    }

    #[tokio::test]
    async fn test_find_valid_honors_expiry_and_revocation() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();

        assert!(h.refresh_store.find_valid(&issued.secret).await.unwrap().is_some());
        assert!(h.refresh_store.find_valid("unknown").await.unwrap().is_none());

        h.clock.advance(Duration::days(31));
        assert!(h.refresh_store.find_valid(&issued.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent_and_monotonic() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();

        h.refresh_store
            .revoke(issued.record.id, RevocationReason::Logout)
            .await
            .unwrap();
        // Second revocation is a no-op; the original reason survives.
        h.refresh_store
            .revoke(issued.record.id, RevocationReason::AdminAction)
            .await
            .unwrap();

        let record = h.refresh_repo.get(issued.record.id).unwrap();
        assert!(record.revoked);
        assert_eq!(record.revoked_reason.as_deref(), Some("logout"));
    }

    #[tokio::test]
    async fn test_rotate_single_winner_on_same_record() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();

        let replacement = h
            .refresh_store
            .rotate(&issued.record, &h.device())
            .await
            .unwrap();
        assert_ne!(replacement.secret, issued.secret);
        assert!(h.refresh_store.find_valid(&issued.secret).await.unwrap().is_none());

        let err = h
            .refresh_store
            .rotate(&issued.record, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);
    }

    #[tokio::test]
    async fn test_revoke_all_respects_principal_boundaries() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);
        let other = h.add_staff("other@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let mine = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();
        let theirs = h
            .refresh_store
            .create(other.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();

        let revoked = h
            .refresh_store
            .revoke_all_for_principal(staff.id, PrincipalType::Staff, RevocationReason::LogoutAll)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        assert!(h.refresh_store.find_valid(&mine.secret).await.unwrap().is_none());
        assert!(h.refresh_store.find_valid(&theirs.secret).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_noop_then_exact_eligibility() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        assert_eq!(h.refresh_store.cleanup().await.unwrap(), 0);

        // One live record, one revoked record.
        let live = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();
        let revoked = h
            .refresh_store
            .create(staff.id, PrincipalType::Staff, &h.device())
            .await
            .unwrap();
        h.refresh_store
            .revoke(revoked.record.id, RevocationReason::Logout)
            .await
            .unwrap();

        // Inside the 7-day retention window nothing is eligible.
        h.clock.advance(Duration::days(6));
        assert_eq!(h.refresh_store.cleanup().await.unwrap(), 0);

        // Past retention the revoked row goes; the live one stays.
        h.clock.advance(Duration::days(2));
        assert_eq!(h.refresh_store.cleanup().await.unwrap(), 1);
        assert!(h.refresh_repo.get(live.record.id).is_some());
        assert!(h.refresh_repo.get(revoked.record.id).is_none());

        // Past the 30-day lifetime the remaining row expires too.
        h.clock.advance(Duration::days(23));
        assert_eq!(h.refresh_store.cleanup().await.unwrap(), 1);
        assert_eq!(h.refresh_repo.len(), 0);
    }
}
