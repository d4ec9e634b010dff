//! Access token validation with revocation awareness.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use tourhub_core::config::auth::AuthConfig;
use tourhub_core::error::AppError;

use crate::blacklist::TokenBlacklist;

use super::claims::AccessClaims;

/// Validates access tokens and consults the blacklist.
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Revocation source of truth.
    blacklist: Arc<TokenBlacklist>,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig, blacklist: Arc<TokenBlacklist>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            blacklist,
        }
    }

    /// Decodes and validates an access token string.
    ///
    /// Checks, in order:
    /// 1. Blacklist membership on the token hash — revocation
    ///    short-circuits before the signature is trusted.
    /// 2. Signature, expiry, issuer, and audience.
    /// 3. Required-claim completeness.
    /// 4. Principal-wide revocation sentinel: tokens issued before the
    ///    newest sentinel are rejected even within their lifetime.
    pub async fn verify(&self, token: &str) -> Result<AccessClaims, AppError> {
        if self.blacklist.is_blacklisted(token).await? {
            return Err(AppError::token_revoked("Token has been revoked"));
        }

        let claims = self.decode_token(token)?;
        claims.validate_required()?;

        if let Some(cutoff) = self
            .blacklist
            .principal_revoked_after(claims.sub, claims.principal_type)
            .await?
        {
            if claims.issued_at() < cutoff {
                return Err(AppError::token_revoked(
                    "All tokens for this principal were revoked after issuance",
                ));
            }
        }

        Ok(claims)
    }

    /// Internal decode mapping library errors onto the taxonomy.
    ///
    /// Expired and tampered tokens are both unauthorized, but callers
    /// need to tell them apart.
    fn decode_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::token_expired("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::token_invalid("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::token_invalid("Invalid token signature")
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AppError::token_invalid("Invalid token issuer")
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AppError::token_invalid("Invalid token audience")
                }
                _ => AppError::token_invalid(format!("Token validation failed: {e}")),
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use tourhub_core::error::ErrorKind;
    use tourhub_entity::principal::PrincipalType;
    use tourhub_entity::staff::StaffRole;
    use tourhub_entity::token::RevocationReason;

    use crate::testing::{TestHarness, test_config};

    #[tokio::test]
    async fn test_verify_accepts_freshly_issued_token() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        let claims = h.verifier.verify(&issued.token).await.unwrap();
        assert_eq!(claims.sub, staff.id);
        assert_eq!(claims.principal_type, PrincipalType::Staff);
        assert_eq!(claims.jti, issued.claims.jti);
    }

    #[tokio::test]
    async fn test_tampered_token_is_invalid_not_expired() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push(if issued.token.ends_with('A') { 'B' } else { 'A' });

        let err = h.verifier.verify(&tampered).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[tokio::test]
    async fn test_token_signed_for_another_audience_is_invalid() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let mut other = test_config();
        other.jwt_audience = "tourhub-partner".into();
        let clock: std::sync::Arc<dyn tourhub_core::clock::Clock> = h.clock.clone();
        let other_issuer = crate::token::TokenIssuer::new(&other, clock).unwrap();

        let issued = other_issuer.issue(&staff).unwrap();
        let err = h.verifier.verify(&issued.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenInvalid);
    }

    #[tokio::test]
    async fn test_blacklist_short_circuits_before_signature_checks() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        h.blacklist
            .add(&issued.token, &issued.claims, RevocationReason::Logout)
            .await
            .unwrap();

        let err = h.verifier.verify(&issued.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);
    }

    #[tokio::test]
    async fn test_sentinel_rejects_tokens_issued_before_it() {
        let h = TestHarness::new();
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let before = h.issuer.issue(&staff).unwrap();
        h.clock.advance(Duration::seconds(5));

        h.blacklist
            .mark_all_for_principal(
                staff.id,
                PrincipalType::Staff,
                RevocationReason::SecurityAlert,
            )
            .await
            .unwrap();

        let err = h.verifier.verify(&before.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenRevoked);

        // Tokens minted after the sentinel pass.
        h.clock.advance(Duration::seconds(5));
        let after = h.issuer.issue(&staff).unwrap();
        h.verifier.verify(&after.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_issuer_clock_yields_token_expired() {
        let h = TestHarness::new();
        h.clock.set(Utc::now() - Duration::hours(2));
        let staff = h.add_staff("agent@tourhub.test", "tr4vel-Desk#991", StaffRole::Agent);

        let issued = h.issuer.issue(&staff).unwrap();
        let err = h.verifier.verify(&issued.token).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TokenExpired);
    }
}
