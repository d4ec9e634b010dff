//! System permissions granted through staff roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A system-level capability evaluated by the authorization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create, update, and deactivate staff accounts.
    ManageStaff,
    /// Create and update tour offerings.
    ManageTours,
    /// Create, modify, and cancel bookings.
    ManageBookings,
    /// Maintain the destination catalogue.
    ManageDestinations,
    /// Read operational and sales reports.
    ViewReports,
    /// Initiate payment refunds.
    ProcessRefunds,
    /// Terminate other principals' sessions.
    ManageSessions,
    /// Read the audit log.
    ViewAuditLog,
}

impl Permission {
    /// Return the permission as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageStaff => "manage_staff",
            Self::ManageTours => "manage_tours",
            Self::ManageBookings => "manage_bookings",
            Self::ManageDestinations => "manage_destinations",
            Self::ViewReports => "view_reports",
            Self::ProcessRefunds => "process_refunds",
            Self::ManageSessions => "manage_sessions",
            Self::ViewAuditLog => "view_audit_log",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
