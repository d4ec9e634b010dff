//! Access-token blacklist entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::principal::PrincipalType;

/// Discriminates single-token rows from principal-wide sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "blacklist_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BlacklistKind {
    /// One revoked access token, identified by its hash.
    Token,
    /// "Every token issued for this principal before `created_at` is
    /// invalid" — one row instead of one per outstanding token.
    Sentinel,
}

/// A persisted revocation record for access tokens.
///
/// Token rows copy `expires_at` from the token they revoke and therefore
/// never outlive it; sentinel rows carry their own fixed ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlacklistEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Row discriminator.
    pub kind: BlacklistKind,
    /// SHA-256 hex digest of the revoked token. Null for sentinels.
    pub token_hash: Option<String>,
    /// JWT ID of the revoked token. Null for sentinels.
    pub jti: Option<Uuid>,
    /// The principal the revocation applies to.
    pub principal_id: Uuid,
    /// The principal's type.
    pub principal_type: PrincipalType,
    /// When the entry stops mattering and may be deleted.
    pub expires_at: DateTime<Utc>,
    /// Why the revocation happened.
    pub reason: String,
    /// When the entry was written. For sentinels this is the cutoff:
    /// tokens issued before it are rejected.
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new blacklist entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlacklistEntry {
    /// Row discriminator.
    pub kind: BlacklistKind,
    /// Token hash, for token rows.
    pub token_hash: Option<String>,
    /// JWT ID, for token rows.
    pub jti: Option<Uuid>,
    /// The principal the revocation applies to.
    pub principal_id: Uuid,
    /// The principal's type.
    pub principal_type: PrincipalType,
    /// Entry expiry.
    pub expires_at: DateTime<Utc>,
    /// Revocation reason.
    pub reason: String,
    /// Creation time (from the injected clock).
    pub created_at: DateTime<Utc>,
}
