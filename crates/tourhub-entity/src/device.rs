//! Opaque device metadata attached to refresh records.

use serde::{Deserialize, Serialize};

/// Device metadata captured by the HTTP layer at login/refresh time.
///
/// Stored alongside refresh records for audit only. This core never
/// parses or validates it beyond copying the IP address into its own
/// column for grouped audit queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Raw user agent string.
    pub user_agent: Option<String>,
    /// Remote IP address as reported by the edge.
    pub ip_address: Option<String>,
    /// Caller-provided device identifier.
    pub device_id: Option<String>,
    /// Platform hint ("web", "ios", "android", ...).
    pub platform: Option<String>,
}

impl DeviceInfo {
    /// Serialize into the opaque JSON blob stored with the record.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
