//! Session lifecycle coordinator — login, refresh, logout flows.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::AuthConfig;
use tourhub_core::error::AppError;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::StaffRepository;
use tourhub_entity::device::DeviceInfo;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::staff::{Permission, Staff, StaffRole, StaffStatus};
use tourhub_entity::token::RevocationReason;

use crate::blacklist::TokenBlacklist;
use crate::lockout::LockoutGuard;
use crate::password::{PasswordHasher, PasswordValidator};
use crate::permission::PermissionCache;
use crate::refresh::RefreshTokenStore;
use crate::token::{TokenIssuer, TokenVerifier};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Opaque refresh secret (the only plaintext copy).
    pub refresh_token: String,
    /// The authenticated staff member.
    pub staff: Staff,
    /// Resolved permission set.
    pub permissions: HashSet<Permission>,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    /// New signed access token.
    pub access_token: String,
    /// Access token expiry.
    pub access_expires_at: DateTime<Utc>,
    /// Replacement refresh secret when rotation is enabled.
    pub refresh_token: Option<String>,
    /// The staff member the credential belongs to.
    pub staff: Staff,
}

/// What a best-effort logout managed to revoke.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogoutSummary {
    /// The access token was blacklisted.
    pub access_token_revoked: bool,
    /// The refresh record was revoked.
    pub refresh_token_revoked: bool,
}

/// What a principal-wide logout managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogoutAllSummary {
    /// Refresh records flipped to revoked.
    pub refresh_tokens_revoked: u64,
    /// The blacklist sentinel was written.
    pub sentinel_written: bool,
}

/// Orchestrates login, refresh, logout, and principal-wide credential
/// invalidation by composing the stores and guards.
#[derive(Clone)]
pub struct SessionLifecycleCoordinator {
    /// Staff persistence.
    staff_repo: Arc<dyn StaffRepository>,
    /// Access token signing.
    issuer: Arc<TokenIssuer>,
    /// Access token validation.
    verifier: Arc<TokenVerifier>,
    /// Refresh credential store.
    refresh_store: Arc<RefreshTokenStore>,
    /// Access token revocation.
    blacklist: Arc<TokenBlacklist>,
    /// Brute-force lockout.
    lockout: Arc<LockoutGuard>,
    /// Permission cache.
    permissions: Arc<PermissionCache>,
    /// Credential primitive.
    hasher: Arc<PasswordHasher>,
    /// New-password policy.
    password_policy: PasswordValidator,
    /// Whether refresh rotates the credential. Resolved at construction,
    /// not looked up per call.
    rotation_enabled: bool,
    /// Injected clock.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionLifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycleCoordinator")
            .field("rotation_enabled", &self.rotation_enabled)
            .finish()
    }
}

impl SessionLifecycleCoordinator {
    /// Creates a new coordinator with all required dependencies.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        staff_repo: Arc<dyn StaffRepository>,
        issuer: Arc<TokenIssuer>,
        verifier: Arc<TokenVerifier>,
        refresh_store: Arc<RefreshTokenStore>,
        blacklist: Arc<TokenBlacklist>,
        lockout: Arc<LockoutGuard>,
        permissions: Arc<PermissionCache>,
        hasher: Arc<PasswordHasher>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            staff_repo,
            issuer,
            verifier,
            refresh_store,
            blacklist,
            lockout,
            permissions,
            hasher,
            password_policy: PasswordValidator::new(config),
            rotation_enabled: config.rotate_refresh_tokens,
            clock,
        }
    }

    /// Performs the complete login flow:
    ///
    /// 1. Resolve the principal (unknown email is indistinguishable
    ///    from a wrong password)
    /// 2. Lockout check — a locked account rejects even correct
    ///    credentials
    /// 3. Account status check
    /// 4. Verify the password; a mismatch counts a failure atomically
    /// 5. Clear the failure counter, stamp the login
    /// 6. Issue the access token and create the refresh record
    /// 7. Resolve permissions
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device: &DeviceInfo,
    ) -> AppResult<LoginOutcome> {
        let staff = match self.staff_repo.find_by_email(email).await? {
            Some(staff) => staff,
            None => {
                info!(target: "audit", email = %email, outcome = "failure", reason = "unknown_principal", "Login rejected");
                return Err(AppError::invalid_credentials("Invalid email or password"));
            }
        };

        if self.lockout.is_locked(&staff) {
            let until = staff.locked_until.unwrap_or_else(|| self.clock.now());
            info!(target: "audit", principal_id = %staff.id, outcome = "failure", reason = "locked", "Login rejected");
            return Err(AppError::account_locked(until));
        }

        self.check_account_status(&staff)?;

        let password_valid = self.hasher.verify_password(password, &staff.password_hash)?;
        if !password_valid {
            // Counted only for definitive credential failures; an
            // infrastructure error below propagates as such instead of
            // masquerading as a wrong password.
            let status = self.lockout.record_failure(staff.id).await?;
            info!(
                target: "audit",
                principal_id = %staff.id,
                outcome = "failure",
                reason = "bad_password",
                failed_attempts = status.failed_attempts,
                "Login rejected"
            );
            return Err(AppError::invalid_credentials("Invalid email or password"));
        }

        self.lockout.record_success(staff.id).await?;

        let issued = self.issuer.issue(&staff)?;
        let refresh = self
            .refresh_store
            .create(staff.id, PrincipalType::Staff, device)
            .await?;
        let permissions = self.permissions.get(staff.id).await?;

        info!(
            target: "audit",
            principal_id = %staff.id,
            outcome = "success",
            jti = %issued.claims.jti,
            "Login succeeded"
        );

        Ok(LoginOutcome {
            access_token: issued.token,
            access_expires_at: issued.expires_at,
            refresh_token: refresh.secret,
            staff,
            permissions,
        })
    }

    /// Exchanges a refresh secret for a new access token, optionally
    /// rotating the refresh credential.
    ///
    /// Concurrent calls presenting the same secret while rotation is
    /// enabled race on a single conditional update: exactly one wins,
    /// the rest fail with `RefreshTokenInvalid`.
    pub async fn refresh(&self, secret: &str, device: &DeviceInfo) -> AppResult<RefreshOutcome> {
        let record = self
            .refresh_store
            .find_valid(secret)
            .await?
            .ok_or_else(|| AppError::refresh_token_invalid("Unknown or expired refresh token"))?;

        let staff = match self.staff_repo.find_by_id(record.principal_id).await? {
            Some(staff) if staff.can_authenticate() => staff,
            other => {
                // The principal can no longer authenticate; the credential
                // must not survive the attempt.
                self.refresh_store
                    .revoke(record.id, RevocationReason::AccountInactive)
                    .await?;
                info!(
                    target: "audit",
                    principal_id = %record.principal_id,
                    outcome = "failure",
                    reason = "principal_inactive",
                    "Refresh rejected"
                );
                return Err(match other.map(|s| s.status) {
                    Some(StaffStatus::Blocked) => {
                        AppError::account_blocked("Account is blocked")
                    }
                    _ => AppError::account_inactive("Account is no longer active"),
                });
            }
        };

        let new_secret = if self.rotation_enabled {
            let rotated = self.refresh_store.rotate(&record, device).await?;
            Some(rotated.secret)
        } else {
            self.refresh_store.touch_usage(record.id).await?;
            None
        };

        let issued = self.issuer.issue(&staff)?;

        info!(
            target: "audit",
            principal_id = %staff.id,
            outcome = "success",
            rotated = self.rotation_enabled,
            "Refresh succeeded"
        );

        Ok(RefreshOutcome {
            access_token: issued.token,
            access_expires_at: issued.expires_at,
            refresh_token: new_secret,
            staff,
        })
    }

    /// Best-effort logout of a single session.
    ///
    /// Either credential may be absent; revoking whichever is present is
    /// a partial success, not an error.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        refresh_secret: Option<&str>,
    ) -> AppResult<LogoutSummary> {
        let mut summary = LogoutSummary::default();

        if let Some(token) = access_token {
            match self.verifier.verify(token).await {
                Ok(claims) => {
                    self.blacklist
                        .add(token, &claims, RevocationReason::Logout)
                        .await?;
                    summary.access_token_revoked = true;
                }
                Err(e) if e.kind.is_auth_outcome() => {
                    // Already expired, revoked, or not ours; nothing left
                    // to invalidate.
                    warn!(error = %e, "Logout presented an unusable access token");
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(secret) = refresh_secret {
            if let Some(record) = self.refresh_store.find_valid(secret).await? {
                self.refresh_store
                    .revoke(record.id, RevocationReason::Logout)
                    .await?;
                summary.refresh_token_revoked = true;
            }
        }

        Ok(summary)
    }

    /// Terminates every outstanding session for a principal.
    ///
    /// Best-effort: each sub-step failure is logged and the rest still
    /// run; the caller is never failed by a partial outcome.
    pub async fn logout_all(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
    ) -> LogoutAllSummary {
        let mut summary = LogoutAllSummary::default();

        match self
            .refresh_store
            .revoke_all_for_principal(principal_id, principal_type, reason)
            .await
        {
            Ok(count) => summary.refresh_tokens_revoked = count,
            Err(e) => {
                error!(principal_id = %principal_id, error = %e, "Failed to bulk-revoke refresh tokens");
            }
        }

        match self
            .blacklist
            .mark_all_for_principal(principal_id, principal_type, reason)
            .await
        {
            Ok(()) => summary.sentinel_written = true,
            Err(e) => {
                error!(principal_id = %principal_id, error = %e, "Failed to write revocation sentinel");
            }
        }

        self.permissions.invalidate(principal_id);

        summary
    }

    /// Verifies the current password, applies the new one, and
    /// terminates every outstanding session for the principal.
    pub async fn change_password(
        &self,
        staff_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let staff = self
            .staff_repo
            .find_by_id(staff_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Staff {staff_id} not found")))?;

        let current_valid = self
            .hasher
            .verify_password(current_password, &staff.password_hash)?;
        if !current_valid {
            return Err(AppError::invalid_credentials(
                "Current password is incorrect",
            ));
        }

        self.password_policy
            .validate_not_same(current_password, new_password)?;
        self.password_policy.validate(new_password)?;

        let new_hash = self.hasher.hash_password(new_password)?;
        self.staff_repo
            .update_password(staff_id, &new_hash, self.clock.now())
            .await?;

        self.logout_all(
            staff_id,
            PrincipalType::Staff,
            RevocationReason::PasswordChange,
        )
        .await;

        info!(target: "audit", principal_id = %staff_id, "Password changed");
        Ok(())
    }

    /// Applies a role change and terminates every outstanding session so
    /// the old role's tokens and cached permissions cannot outlive it.
    pub async fn change_role(&self, staff_id: Uuid, new_role: StaffRole) -> AppResult<Staff> {
        let staff = self.staff_repo.update_role(staff_id, new_role).await?;

        self.permissions.invalidate(staff_id);
        self.logout_all(staff_id, PrincipalType::Staff, RevocationReason::RoleChange)
            .await;

        info!(target: "audit", principal_id = %staff_id, role = %new_role, "Role changed");
        Ok(staff)
    }

    /// Maps account status onto the error taxonomy.
    fn check_account_status(&self, staff: &Staff) -> AppResult<()> {
        match staff.status {
            StaffStatus::Active => Ok(()),
            StaffStatus::Inactive => {
                info!(target: "audit", principal_id = %staff.id, outcome = "failure", reason = "inactive", "Login rejected");
                Err(AppError::account_inactive(
                    "Account is deactivated. Contact an administrator.",
                ))
            }
            StaffStatus::Blocked => {
                info!(target: "audit", principal_id = %staff.id, outcome = "failure", reason = "blocked", "Login rejected");
                Err(AppError::account_blocked(
                    "Account is blocked. Contact an administrator.",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use tourhub_core::error::ErrorKind;

    use crate::testing::{TestHarness, test_config};

    use super::*;

    #[tokio::test]
    async fn test_login_returns_verifiable_token_and_permissions() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let outcome = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let claims = h.verifier.verify(&outcome.access_token).await.unwrap();
        assert_eq!(claims.sub, outcome.staff.id);
        assert_eq!(claims.role, StaffRole::Agent);
        assert!(outcome.permissions.contains(&Permission::ManageBookings));
        assert!(!outcome.permissions.contains(&Permission::ManageStaff));
        assert!(
            h.staff_repo
                .get(outcome.staff.id)
                .unwrap()
                .last_login_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_token_expires_after_nominal_lifetime() {
        let h = TestHarness::new();
        // Issue in the past so the 15m lifetime has already elapsed by
        // real wall-clock time, which is what signature validation uses.
        h.clock.set(Utc::now() - Duration::hours(1));
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        let err = h.verifier.verify(&issued.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let unknown = h
            .coordinator
            .login("nobody@tourhub.test", "whatever", &h.device())
            .await
            .unwrap_err();
        let wrong = h
            .coordinator
            .login("agent@tourhub.test", "wrong-password", &h.device())
            .await
            .unwrap_err();

        assert_eq!(unknown.kind, ErrorKind::InvalidCredentials);
        assert_eq!(wrong.kind, ErrorKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_lockout_walk() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        // Five wrong passwords: InvalidCredentials each, counter 1..=5.
        for expected in 1..=5 {
            let err = h
                .coordinator
                .login("agent@tourhub.test", "wrong-password", &h.device())
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidCredentials);
            assert_eq!(
                h.staff_repo.get(staff.id).unwrap().failed_login_attempts,
                expected
            );
        }

        let locked_until = h.staff_repo.get(staff.id).unwrap().locked_until.unwrap();
        assert_eq!(locked_until, h.clock.now() + Duration::hours(2));

        // Sixth attempt with the CORRECT password still fails: locked.
        let err = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccountLocked);
        assert_eq!(err.locked_until, Some(locked_until));

        // Past the lock, a correct login succeeds and resets the counter.
        h.clock.advance(Duration::hours(2) + Duration::seconds(1));
        h.coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();
        let after = h.staff_repo.get(staff.id).unwrap();
        assert_eq!(after.failed_login_attempts, 0);
        assert_eq!(after.locked_until, None);
    }

    #[tokio::test]
    async fn test_expired_lock_restarts_counter_at_one() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        for _ in 0..5 {
            let _ = h
                .coordinator
                .login("agent@tourhub.test", "wrong-password", &h.device())
                .await;
        }
        assert!(h.staff_repo.get(staff.id).unwrap().locked_until.is_some());

        // After the lock expires, the next failure starts a fresh streak
        // instead of compounding the old one.
        h.clock.advance(Duration::hours(3));
        let _ = h
            .coordinator
            .login("agent@tourhub.test", "wrong-password", &h.device())
            .await;
        let after = h.staff_repo.get(staff.id).unwrap();
        assert_eq!(after.failed_login_attempts, 1);
        assert_eq!(after.locked_until, None);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_invalidates_old_secret() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let refreshed = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap();
        let new_secret = refreshed.refresh_token.expect("rotation enabled");
        assert_ne!(new_secret, login.refresh_token);

        // The very next use of the rotated-away secret fails.
        let err = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);

        // The replacement works.
        h.coordinator
            .refresh(&new_secret, &h.device())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rotation_race_has_exactly_one_winner() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let secret = login.refresh_token;
        let device = h.device();
        let (a, b, c, d) = tokio::join!(
            h.coordinator.refresh(&secret, &device),
            h.coordinator.refresh(&secret, &device),
            h.coordinator.refresh(&secret, &device),
            h.coordinator.refresh(&secret, &device),
        );

        let results = [a, b, c, d];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for result in &results {
            if let Err(e) = result {
                assert_eq!(e.kind, ErrorKind::RefreshTokenInvalid);
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_without_rotation_allows_reuse() {
        let mut config = test_config();
        config.rotate_refresh_tokens = false;
        let h = TestHarness::with_config(config);
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let first = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap();
        assert!(first.refresh_token.is_none());

        // Same secret remains usable while valid, with usage audited.
        let second = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap();
        assert!(second.refresh_token.is_none());

        let record = h
            .refresh_store
            .find_valid(&login.refresh_token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.usage_count, 2);
    }

    #[tokio::test]
    async fn test_refresh_for_deactivated_principal_revokes_record() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        h.staff_repo.set_status(staff.id, StaffStatus::Inactive);

        let err = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AccountInactive);

        // The credential did not survive the attempt.
        let err = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);
    }

    #[tokio::test]
    async fn test_logout_revokes_both_credentials() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let summary = h
            .coordinator
            .logout(Some(&login.access_token), Some(&login.refresh_token))
            .await
            .unwrap();
        assert!(summary.access_token_revoked);
        assert!(summary.refresh_token_revoked);

        let err = h.verifier.verify(&login.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);

        let err = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);
    }

    #[tokio::test]
    async fn test_logout_with_only_refresh_secret_is_partial_success() {
        let h = TestHarness::new();
        h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let summary = h
            .coordinator
            .logout(None, Some(&login.refresh_token))
            .await
            .unwrap();
        assert!(!summary.access_token_revoked);
        assert!(summary.refresh_token_revoked);
    }

    #[tokio::test]
    async fn test_logout_all_invalidates_every_outstanding_credential() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let first = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();
        let second = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        // The sentinel cutoff is strictly-after, so move time past the
        // issuance instant before revoking everything.
        h.clock.advance(Duration::seconds(5));

        let summary = h
            .coordinator
            .logout_all(staff.id, PrincipalType::Staff, RevocationReason::AdminAction)
            .await;
        assert_eq!(summary.refresh_tokens_revoked, 2);
        assert!(summary.sentinel_written);

        // No refresh secret issued before the call works afterwards.
        for secret in [&first.refresh_token, &second.refresh_token] {
            let err = h.coordinator.refresh(secret, &h.device()).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);
        }

        // Access tokens issued before the call are rejected by the
        // sentinel even though they are within their lifetime.
        for token in [&first.access_token, &second.access_token] {
            let err = h.verifier.verify(token).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::TokenRevoked);
        }

        // Tokens issued after the sentinel verify normally. The iat claim
        // has whole-second precision, so move clearly past the cutoff.
        h.clock.advance(Duration::seconds(5));
        let relogin = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();
        h.verifier.verify(&relogin.access_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_change_password_verifies_current_and_terminates_sessions() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();

        let err = h
            .coordinator
            .change_password(staff.id, "wrong-current", "n3w-Secret!2024")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);

        let err = h
            .coordinator
            .change_password(staff.id, "tr4vel-Desk#991", "weak")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        h.clock.advance(Duration::seconds(5));
        h.coordinator
            .change_password(staff.id, "tr4vel-Desk#991", "n3w-Secret!2024")
            .await
            .unwrap();

        // Old credentials are dead; the new password works.
        let err = h
            .coordinator
            .refresh(&login.refresh_token, &h.device())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RefreshTokenInvalid);
        let err = h.verifier.verify(&login.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);

        h.coordinator
            .login("agent@tourhub.test", "n3w-Secret!2024", &h.device())
            .await
            .unwrap();
        assert!(
            h.staff_repo
                .get(staff.id)
                .unwrap()
                .last_password_change_at
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_change_role_invalidates_cached_permissions_and_sessions() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let login = h
            .coordinator
            .login("agent@tourhub.test", "tr4vel-Desk#991", &h.device())
            .await
            .unwrap();
        assert!(!login.permissions.contains(&Permission::ManageStaff));

        h.clock.advance(Duration::seconds(5));
        h.coordinator
            .change_role(staff.id, StaffRole::Admin)
            .await
            .unwrap();

        // The cache reflects the new role immediately, not after TTL.
        let permissions = h.permissions.get(staff.id).await.unwrap();
        assert!(permissions.contains(&Permission::ManageStaff));

        // Outstanding tokens from the old role are gone.
        let err = h.verifier.verify(&login.access_token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }
}
