//! Staff role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::permission::Permission;

/// Roles available to staff principals.
///
/// Roles are ordered by privilege level:
/// SuperAdmin > Admin > Manager > Agent > Support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "staff_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Unrestricted system owner.
    SuperAdmin,
    /// Full administrative access short of system ownership.
    Admin,
    /// Manages agents, tours, and destinations.
    Manager,
    /// Handles bookings and customer requests.
    Agent,
    /// Read-mostly support access.
    Support,
}

impl StaffRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::SuperAdmin => 5,
            Self::Admin => 4,
            Self::Manager => 3,
            Self::Agent => 2,
            Self::Support => 1,
        }
    }

    /// Check if this role has at least the given role's privileges.
    pub fn has_at_least(&self, other: &StaffRole) -> bool {
        self.privilege_level() >= other.privilege_level()
    }

    /// Whether this role carries the super-admin capability.
    ///
    /// Evaluated structurally; call sites must never compare display names.
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    /// The permission set granted by this role.
    pub fn permissions(&self) -> std::collections::HashSet<Permission> {
        use Permission::*;
        let perms: &[Permission] = match self {
            Self::SuperAdmin | Self::Admin => &[
                ManageStaff,
                ManageTours,
                ManageBookings,
                ManageDestinations,
                ViewReports,
                ProcessRefunds,
                ManageSessions,
                ViewAuditLog,
            ],
            Self::Manager => &[
                ManageTours,
                ManageBookings,
                ManageDestinations,
                ViewReports,
                ProcessRefunds,
            ],
            Self::Agent => &[ManageBookings, ViewReports],
            Self::Support => &[ViewReports],
        };
        perms.iter().copied().collect()
    }

    /// Return the role as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Agent => "agent",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = tourhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "agent" => Ok(Self::Agent),
            "support" => Ok(Self::Support),
            _ => Err(tourhub_core::AppError::validation(format!(
                "Invalid staff role: '{s}'. Expected one of: super_admin, admin, manager, agent, support"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_ordering() {
        assert!(StaffRole::SuperAdmin.has_at_least(&StaffRole::Admin));
        assert!(StaffRole::Admin.has_at_least(&StaffRole::Admin));
        assert!(StaffRole::Manager.has_at_least(&StaffRole::Agent));
        assert!(!StaffRole::Support.has_at_least(&StaffRole::Agent));
    }

    #[test]
    fn test_super_admin_is_structural() {
        assert!(StaffRole::SuperAdmin.is_super_admin());
        assert!(!StaffRole::Admin.is_super_admin());
    }

    #[test]
    fn test_permission_sets_nest_by_privilege() {
        let manager = StaffRole::Manager.permissions();
        let agent = StaffRole::Agent.permissions();
        let support = StaffRole::Support.permissions();

        assert!(agent.is_subset(&manager));
        assert!(support.is_subset(&agent));
        assert!(manager.contains(&Permission::ProcessRefunds));
        assert!(!agent.contains(&Permission::ManageStaff));
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "super_admin".parse::<StaffRole>().unwrap(),
            StaffRole::SuperAdmin
        );
        assert_eq!("AGENT".parse::<StaffRole>().unwrap(), StaffRole::Agent);
        assert!("owner".parse::<StaffRole>().is_err());
    }
}
