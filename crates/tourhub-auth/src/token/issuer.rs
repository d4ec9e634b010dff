//! Access token creation with configurable signing and lifetime.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::warn;
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::{AuthConfig, parse_lifetime};
use tourhub_core::error::AppError;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::staff::Staff;

use super::claims::AccessClaims;

/// Creates signed access tokens for staff principals.
#[derive(Clone)]
pub struct TokenIssuer {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Issuer claim value.
    issuer: String,
    /// Audience claim value.
    audience: String,
    /// Access token lifetime.
    lifetime: Duration,
    /// Injected clock.
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Result of a successful token issuance.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssuedAccessToken {
    /// The signed compact token.
    pub token: String,
    /// The claims embedded in it.
    pub claims: AccessClaims,
    /// Expiry, equal to `claims.expires_at()`.
    pub expires_at: DateTime<Utc>,
}

impl TokenIssuer {
    /// Creates a new issuer from auth configuration.
    ///
    /// Fails with a configuration error if the signing secret is absent.
    /// This is checked once at startup, never per call.
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        if config.jwt_secret.trim().is_empty() {
            return Err(AppError::configuration(
                "JWT signing secret is not configured",
            ));
        }

        let lifetime = match parse_lifetime(&config.access_token_lifetime) {
            Some(lifetime) => lifetime,
            None => {
                warn!(
                    configured = %config.access_token_lifetime,
                    "Malformed access token lifetime, falling back to 15m"
                );
                Duration::minutes(15)
            }
        };

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            lifetime,
            clock,
        })
    }

    /// Issues a signed access token for the given staff principal.
    pub fn issue(&self, staff: &Staff) -> Result<IssuedAccessToken, AppError> {
        let now = self.clock.now();
        let expires_at = now + self.lifetime;

        let claims = AccessClaims {
            sub: staff.id,
            email: staff.email.clone(),
            role: staff.role,
            principal_type: PrincipalType::Staff,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;

        Ok(IssuedAccessToken {
            token,
            claims,
            expires_at,
        })
    }

    /// The configured access token lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}
