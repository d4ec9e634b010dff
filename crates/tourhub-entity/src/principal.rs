//! Principal type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of authenticated entity a credential was issued for.
///
/// Tokens, refresh records, and revocation sentinels are always
/// partitioned by principal type; bulk operations never cross it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "principal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    /// Back-office staff member.
    Staff,
    /// Customer-facing account.
    Customer,
}

impl PrincipalType {
    /// Return the principal type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PrincipalType {
    type Err = tourhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Self::Staff),
            "customer" => Ok(Self::Customer),
            _ => Err(tourhub_core::AppError::validation(format!(
                "Invalid principal type: '{s}'. Expected one of: staff, customer"
            ))),
        }
    }
}
