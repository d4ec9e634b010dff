//! Access token claims payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tourhub_core::error::AppError;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::staff::StaffRole;

/// Claims payload embedded in every access token.
///
/// An explicit struct: a token missing any field fails deserialization
/// during verification instead of being discovered ad hoc downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject — the principal ID.
    pub sub: Uuid,
    /// Principal email at issuance time.
    pub email: String,
    /// Principal role at issuance time.
    pub role: StaffRole,
    /// Which kind of principal the token was issued for.
    pub principal_type: PrincipalType,
    /// Unique token ID for blacklist tracking.
    pub jti: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
}

impl AccessClaims {
    /// Returns the principal ID from the subject claim.
    pub fn principal_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the issued-at time as a `DateTime<Utc>`.
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Rejects structurally present but meaningless required claims.
    ///
    /// serde already guarantees field presence; this catches zeroed IDs
    /// and non-positive timestamps that a malformed issuer could produce.
    pub fn validate_required(&self) -> Result<(), AppError> {
        if self.sub.is_nil() {
            return Err(AppError::token_invalid("Token has an empty subject claim"));
        }
        if self.jti.is_nil() {
            return Err(AppError::token_invalid("Token has an empty jti claim"));
        }
        if self.iat <= 0 {
            return Err(AppError::token_invalid(
                "Token has a missing or invalid issued-at claim",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> AccessClaims {
        let now = Utc::now();
        AccessClaims {
            sub: Uuid::new_v4(),
            email: "agent@tourhub.test".into(),
            role: StaffRole::Agent,
            principal_type: PrincipalType::Staff,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::minutes(15)).timestamp(),
            iss: "tourhub".into(),
            aud: "tourhub-staff".into(),
        }
    }

    #[test]
    fn test_validate_required_accepts_complete_claims() {
        assert!(claims().validate_required().is_ok());
    }

    #[test]
    fn test_validate_required_rejects_nil_ids() {
        let mut c = claims();
        c.sub = Uuid::nil();
        assert!(c.validate_required().is_err());

        let mut c = claims();
        c.jti = Uuid::nil();
        assert!(c.validate_required().is_err());

        let mut c = claims();
        c.iat = 0;
        assert!(c.validate_required().is_err());
    }

    #[test]
    fn test_missing_field_fails_deserialization() {
        let mut value = serde_json::to_value(claims()).unwrap();
        value.as_object_mut().unwrap().remove("principal_type");
        assert!(serde_json::from_value::<AccessClaims>(value).is_err());
    }
}
