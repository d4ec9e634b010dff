//! Staff account status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account status for a staff principal.
///
/// Lockout is not a status: it is tracked by the temporal `locked_until`
/// field on the staff row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "staff_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    /// Account is active and can authenticate.
    Active,
    /// Account is deactivated (e.g., staff member left).
    Inactive,
    /// Account is administratively blocked.
    Blocked,
}

impl StaffStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for StaffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StaffStatus {
    type Err = tourhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "blocked" => Ok(Self::Blocked),
            _ => Err(tourhub_core::AppError::validation(format!(
                "Invalid staff status: '{s}'. Expected one of: active, inactive, blocked"
            ))),
        }
    }
}
