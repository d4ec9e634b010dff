//! Token blacklist operations over the persistence seam.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::AuthConfig;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::BlacklistRepository;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::token::{BlacklistKind, NewBlacklistEntry, RevocationReason};

use crate::digest::sha256_hex;
use crate::token::AccessClaims;

/// Invalidates access tokens before their nominal expiry.
///
/// The backing store is the single source of truth: every check
/// re-derives its answer from current store state, so revocation is
/// visible to new requests immediately.
#[derive(Debug, Clone)]
pub struct TokenBlacklist {
    /// Blacklist persistence.
    repo: Arc<dyn BlacklistRepository>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Lifetime ceiling for principal-wide sentinels.
    sentinel_ttl: Duration,
}

impl TokenBlacklist {
    /// Creates a new blacklist over the given repository.
    pub fn new(
        repo: Arc<dyn BlacklistRepository>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            repo,
            clock,
            sentinel_ttl: config.sentinel_ttl(),
        }
    }

    /// Blacklists a single access token.
    ///
    /// The entry's expiry is copied from the token's own expiry, so a
    /// blacklist row never extends a token's effective lifetime.
    pub async fn add(
        &self,
        token: &str,
        claims: &AccessClaims,
        reason: RevocationReason,
    ) -> AppResult<()> {
        let entry = NewBlacklistEntry {
            kind: BlacklistKind::Token,
            token_hash: Some(sha256_hex(token)),
            jti: Some(claims.jti),
            principal_id: claims.sub,
            principal_type: claims.principal_type,
            expires_at: claims.expires_at(),
            reason: reason.as_str().to_string(),
            created_at: self.clock.now(),
        };

        self.repo.insert(&entry).await?;

        info!(
            target: "audit",
            principal_id = %claims.sub,
            jti = %claims.jti,
            reason = %reason,
            "Access token revoked"
        );

        Ok(())
    }

    /// Whether the given token has been revoked.
    ///
    /// Called before signature verification is trusted, so revocation
    /// short-circuits everything else.
    pub async fn is_blacklisted(&self, token: &str) -> AppResult<bool> {
        self.repo
            .exists_token_hash(&sha256_hex(token), self.clock.now())
            .await
    }

    /// Writes one sentinel row meaning "every token issued for this
    /// principal before now is invalid" — instead of one row per
    /// outstanding token.
    pub async fn mark_all_for_principal(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let entry = NewBlacklistEntry {
            kind: BlacklistKind::Sentinel,
            token_hash: None,
            jti: None,
            principal_id,
            principal_type,
            expires_at: now + self.sentinel_ttl,
            reason: reason.as_str().to_string(),
            created_at: now,
        };

        self.repo.insert(&entry).await?;

        info!(
            target: "audit",
            principal_id = %principal_id,
            principal_type = %principal_type,
            reason = %reason,
            "All access tokens for principal revoked"
        );

        Ok(())
    }

    /// Creation time of the newest live sentinel for the principal.
    ///
    /// Verification rejects any token whose issued-at predates this.
    pub async fn principal_revoked_after(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
    ) -> AppResult<Option<DateTime<Utc>>> {
        self.repo
            .latest_sentinel_at(principal_id, principal_type, self.clock.now())
            .await
    }

    /// Deletes entries past their expiry. Returns the number removed;
    /// zero eligible rows is a successful no-op.
    pub async fn cleanup(&self) -> AppResult<u64> {
        self.repo.delete_expired(self.clock.now()).await
    }

    /// Deletes entries created before the cutoff, regardless of expiry.
    pub async fn prune_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        self.repo.delete_created_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use tourhub_entity::staff::StaffRole;

    use crate::testing::TestHarness;

    use super::*;

    #[tokio::test]
    async fn test_add_then_membership_check() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        assert!(!h.blacklist.is_blacklisted(&issued.token).await.unwrap());

        h.blacklist
            .add(&issued.token, &issued.claims, RevocationReason::Logout)
            .await
            .unwrap();

        assert!(h.blacklist.is_blacklisted(&issued.token).await.unwrap());
        assert!(!h.blacklist.is_blacklisted("some-other-token").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_never_outlives_the_token() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        h.blacklist
            .add(&issued.token, &issued.claims, RevocationReason::Logout)
            .await
            .unwrap();

        // Once the token itself is past expiry, the membership row is
        // eligible for cleanup and no longer reported.
        h.clock.advance(Duration::minutes(16));
        assert!(!h.blacklist.is_blacklisted(&issued.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_sentinel_lifecycle() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);
        let marked_at = h.clock.now();

        assert_eq!(
            h.blacklist
                .principal_revoked_after(staff.id, PrincipalType::Staff)
                .await
                .unwrap(),
            None
        );

        h.blacklist
            .mark_all_for_principal(
                staff.id,
                PrincipalType::Staff,
                RevocationReason::SecurityAlert,
            )
            .await
            .unwrap();

        assert_eq!(
            h.blacklist
                .principal_revoked_after(staff.id, PrincipalType::Staff)
                .await
                .unwrap(),
            Some(marked_at)
        );

        // Sentinels never apply across principal types.
        assert_eq!(
            h.blacklist
                .principal_revoked_after(staff.id, PrincipalType::Customer)
                .await
                .unwrap(),
            None
        );

        // Past its ceiling the sentinel stops mattering.
        h.clock.advance(Duration::hours(25));
        assert_eq!(
            h.blacklist
                .principal_revoked_after(staff.id, PrincipalType::Staff)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_cleanup_noop_then_exact() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        assert_eq!(h.blacklist.cleanup().await.unwrap(), 0);

        let issued = h.issuer.issue(&staff).unwrap();
        h.blacklist
            .add(&issued.token, &issued.claims, RevocationReason::Logout)
            .await
            .unwrap();
        h.blacklist
            .mark_all_for_principal(staff.id, PrincipalType::Staff, RevocationReason::AdminAction)
            .await
            .unwrap();

        // Only the token row (15m expiry) is eligible; the sentinel
        // still has most of its 24h ceiling left.
        h.clock.advance(Duration::hours(1));
        assert_eq!(h.blacklist.cleanup().await.unwrap(), 1);
        assert_eq!(h.blacklist_repo.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_removes_old_rows_regardless_of_expiry() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        h.blacklist
            .mark_all_for_principal(staff.id, PrincipalType::Staff, RevocationReason::AdminAction)
            .await
            .unwrap();

        let removed = h
            .blacklist
            .prune_created_before(h.clock.now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(h.blacklist_repo.len(), 0);
    }
}
