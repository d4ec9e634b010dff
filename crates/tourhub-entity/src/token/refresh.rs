//! Refresh token record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::principal::PrincipalType;

/// A persisted refresh credential.
///
/// Only the SHA-256 hash of the opaque secret is stored; the plaintext
/// secret exists solely in the response that minted it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// SHA-256 hex digest of the opaque secret.
    pub token_hash: String,
    /// The principal this credential was issued to.
    pub principal_id: Uuid,
    /// The principal's type.
    pub principal_type: PrincipalType,
    /// Opaque device metadata captured at issuance (audit only).
    pub device_info: Option<serde_json::Value>,
    /// IP address copied from the device metadata for grouped audit queries.
    pub ip_address: Option<String>,
    /// Hard expiry of the credential.
    pub expires_at: DateTime<Utc>,
    /// Whether the credential has been revoked. Monotonic: never unset.
    pub revoked: bool,
    /// When the credential was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the credential was revoked.
    pub revoked_reason: Option<String>,
    /// How many times the credential has been exchanged.
    pub usage_count: i32,
    /// When the credential was last exchanged.
    pub last_used_at: Option<DateTime<Utc>>,
    /// When the credential was created.
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Whether the record is usable as of `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Data required to persist a new refresh credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRefreshToken {
    /// SHA-256 hex digest of the opaque secret.
    pub token_hash: String,
    /// The principal this credential is issued to.
    pub principal_id: Uuid,
    /// The principal's type.
    pub principal_type: PrincipalType,
    /// Opaque device metadata.
    pub device_info: Option<serde_json::Value>,
    /// IP address for audit grouping.
    pub ip_address: Option<String>,
    /// Hard expiry.
    pub expires_at: DateTime<Utc>,
    /// Creation time (from the injected clock).
    pub created_at: DateTime<Utc>,
}

/// Refresh-token creation count for one IP within the anomaly window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IpCreationCount {
    /// Source IP address.
    pub ip_address: String,
    /// Creations within the window.
    pub created: i64,
}

/// Security-reason revocation count for one principal within the window.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrincipalRevocationCount {
    /// The affected principal.
    pub principal_id: Uuid,
    /// Security-reason revocations within the window.
    pub revoked: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(revoked: bool, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            token_hash: "h".into(),
            principal_id: Uuid::new_v4(),
            principal_type: PrincipalType::Staff,
            device_info: None,
            ip_address: None,
            expires_at,
            revoked,
            revoked_at: None,
            revoked_reason: None,
            usage_count: 0,
            last_used_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        assert!(record(false, now + Duration::days(1)).is_valid_at(now));
        assert!(!record(false, now - Duration::seconds(1)).is_valid_at(now));
        assert!(!record(true, now + Duration::days(1)).is_valid_at(now));
    }
}
