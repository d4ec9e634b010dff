//! Unified application error types for TourHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Authentication-outcome errors and
//! infrastructure errors are deliberately distinguishable so callers never
//! conflate "wrong password" with "database unreachable".

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// The presented credentials did not match.
    InvalidCredentials,
    /// The account is temporarily locked after repeated failures.
    AccountLocked,
    /// The account has been deactivated.
    AccountInactive,
    /// The account has been administratively blocked.
    AccountBlocked,
    /// The access token is past its expiry.
    TokenExpired,
    /// The access token is malformed or its signature does not verify.
    TokenInvalid,
    /// The access token was revoked before its natural expiry.
    TokenRevoked,
    /// The refresh token is unknown, expired, revoked, or lost a rotation race.
    RefreshTokenInvalid,
    /// The caller is authenticated but not permitted to perform the action.
    Authorization,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// A configuration error occurred (fatal, startup-time only).
    Configuration,
    /// The persistent store failed or was unreachable.
    Database,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Whether this kind describes an infrastructure failure rather than an
    /// authentication outcome. Infrastructure errors may be retried once by
    /// the caller; authentication outcomes are final for the request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Database | Self::Serialization | Self::Internal
        )
    }

    /// Whether this kind is a definitive authentication/authorization outcome.
    pub fn is_auth_outcome(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::AccountLocked
                | Self::AccountInactive
                | Self::AccountBlocked
                | Self::TokenExpired
                | Self::TokenInvalid
                | Self::TokenRevoked
                | Self::RefreshTokenInvalid
                | Self::Authorization
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvalidCredentials => write!(f, "INVALID_CREDENTIALS"),
            Self::AccountLocked => write!(f, "ACCOUNT_LOCKED"),
            Self::AccountInactive => write!(f, "ACCOUNT_INACTIVE"),
            Self::AccountBlocked => write!(f, "ACCOUNT_BLOCKED"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::TokenInvalid => write!(f, "TOKEN_INVALID"),
            Self::TokenRevoked => write!(f, "TOKEN_REVOKED"),
            Self::RefreshTokenInvalid => write!(f, "REFRESH_TOKEN_INVALID"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Database => write!(f, "DATABASE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout TourHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// When the account becomes unlocked again. Only set for `AccountLocked`.
    pub locked_until: Option<DateTime<Utc>>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            locked_until: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            locked_until: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an invalid-credentials error.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, message)
    }

    /// Create an account-locked error carrying the unlock time.
    pub fn account_locked(until: DateTime<Utc>) -> Self {
        Self {
            kind: ErrorKind::AccountLocked,
            message: format!(
                "Account is locked until {}",
                until.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            locked_until: Some(until),
            source: None,
        }
    }

    /// Create an account-inactive error.
    pub fn account_inactive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccountInactive, message)
    }

    /// Create an account-blocked error.
    pub fn account_blocked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccountBlocked, message)
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a token-invalid error.
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenInvalid, message)
    }

    /// Create a token-revoked error.
    pub fn token_revoked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenRevoked, message)
    }

    /// Create a refresh-token-invalid error.
    pub fn refresh_token_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RefreshTokenInvalid, message)
    }

    /// Create an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            locked_until: self.locked_until,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infrastructure_vs_auth_outcome() {
        assert!(ErrorKind::Database.is_infrastructure());
        assert!(!ErrorKind::Database.is_auth_outcome());
        assert!(ErrorKind::InvalidCredentials.is_auth_outcome());
        assert!(!ErrorKind::InvalidCredentials.is_infrastructure());
        assert!(ErrorKind::RefreshTokenInvalid.is_auth_outcome());
    }

    #[test]
    fn test_account_locked_carries_unlock_time() {
        let until = Utc::now() + chrono::Duration::hours(2);
        let err = AppError::account_locked(until);
        assert_eq!(err.kind, ErrorKind::AccountLocked);
        assert_eq!(err.locked_until, Some(until));
    }
}
