//! Revocation reason enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a credential was revoked or blacklisted.
///
/// Stored as text with the records it annotates. The security subset is
/// what the anomaly scan counts per principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// Single-session logout requested by the principal.
    Logout,
    /// Principal-wide logout.
    LogoutAll,
    /// Replaced by rotation.
    Rotated,
    /// Password change invalidated all outstanding credentials.
    PasswordChange,
    /// Role change invalidated all outstanding credentials.
    RoleChange,
    /// The account was no longer active when the credential was presented.
    AccountInactive,
    /// Revoked in response to a suspected compromise.
    SecurityAlert,
    /// Revoked by an administrator.
    AdminAction,
}

impl RevocationReason {
    /// Reasons counted by the security-revocation anomaly scan.
    pub const SECURITY: &'static [RevocationReason] = &[
        Self::PasswordChange,
        Self::SecurityAlert,
        Self::AdminAction,
    ];

    /// Whether this reason counts toward the security anomaly threshold.
    pub fn is_security(&self) -> bool {
        Self::SECURITY.contains(self)
    }

    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::LogoutAll => "logout_all",
            Self::Rotated => "rotated",
            Self::PasswordChange => "password_change",
            Self::RoleChange => "role_change",
            Self::AccountInactive => "account_inactive",
            Self::SecurityAlert => "security_alert",
            Self::AdminAction => "admin_action",
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RevocationReason {
    type Err = tourhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logout" => Ok(Self::Logout),
            "logout_all" => Ok(Self::LogoutAll),
            "rotated" => Ok(Self::Rotated),
            "password_change" => Ok(Self::PasswordChange),
            "role_change" => Ok(Self::RoleChange),
            "account_inactive" => Ok(Self::AccountInactive),
            "security_alert" => Ok(Self::SecurityAlert),
            "admin_action" => Ok(Self::AdminAction),
            _ => Err(tourhub_core::AppError::validation(format!(
                "Invalid revocation reason: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_subset() {
        assert!(RevocationReason::PasswordChange.is_security());
        assert!(RevocationReason::SecurityAlert.is_security());
        assert!(!RevocationReason::Logout.is_security());
        assert!(!RevocationReason::Rotated.is_security());
    }

    #[test]
    fn test_round_trip() {
        for reason in [
            RevocationReason::Logout,
            RevocationReason::LogoutAll,
            RevocationReason::Rotated,
            RevocationReason::PasswordChange,
            RevocationReason::RoleChange,
            RevocationReason::AccountInactive,
            RevocationReason::SecurityAlert,
            RevocationReason::AdminAction,
        ] {
            assert_eq!(reason.as_str().parse::<RevocationReason>().unwrap(), reason);
        }
    }
}
