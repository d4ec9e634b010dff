//! Authentication and session lifecycle configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Authentication, token, and lockout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256). No default: an absent or
    /// empty secret is a startup configuration error.
    pub jwt_secret: String,
    /// Issuer claim stamped into and required of every access token.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
    /// Audience claim stamped into and required of every access token.
    #[serde(default = "default_audience")]
    pub jwt_audience: String,
    /// Access token lifetime as `"<n><unit>"` with units s/m/h/d.
    /// Malformed values fall back to 15 minutes.
    #[serde(default = "default_access_lifetime")]
    pub access_token_lifetime: String,
    /// Refresh token lifetime in days.
    #[serde(default = "default_refresh_days")]
    pub refresh_token_lifetime_days: i64,
    /// Whether each refresh call rotates the refresh credential.
    #[serde(default = "default_true")]
    pub rotate_refresh_tokens: bool,
    /// Retention window for revoked refresh records, in days.
    #[serde(default = "default_revoked_retention")]
    pub revoked_retention_days: i64,
    /// Lifetime ceiling for principal-wide revocation sentinels, in hours.
    #[serde(default = "default_sentinel_ttl")]
    pub sentinel_ttl_hours: i64,
    /// Maximum failed login attempts before lockout.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: i32,
    /// Account lockout duration in minutes.
    #[serde(default = "default_lockout")]
    pub lockout_duration_minutes: i64,
    /// Permission cache TTL in seconds.
    #[serde(default = "default_permission_ttl")]
    pub permission_cache_ttl_seconds: i64,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
}

impl AuthConfig {
    /// Resolved access token lifetime, with the documented fallback.
    pub fn access_lifetime(&self) -> Duration {
        parse_lifetime(&self.access_token_lifetime).unwrap_or_else(|| Duration::minutes(15))
    }

    /// Resolved refresh token lifetime.
    pub fn refresh_lifetime(&self) -> Duration {
        Duration::days(self.refresh_token_lifetime_days)
    }

    /// Resolved retention window for revoked refresh records.
    pub fn revoked_retention(&self) -> Duration {
        Duration::days(self.revoked_retention_days)
    }

    /// Resolved sentinel lifetime ceiling.
    pub fn sentinel_ttl(&self) -> Duration {
        Duration::hours(self.sentinel_ttl_hours)
    }

    /// Resolved lockout duration.
    pub fn lockout_duration(&self) -> Duration {
        Duration::minutes(self.lockout_duration_minutes)
    }

    /// Resolved permission cache TTL.
    pub fn permission_cache_ttl(&self) -> Duration {
        Duration::seconds(self.permission_cache_ttl_seconds)
    }
}

/// Parse a lifetime string of the form `"<n><unit>"` with units s/m/h/d.
///
/// Returns `None` for anything that does not match the grammar so that the
/// caller can apply its fallback.
pub fn parse_lifetime(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.len() < 2 || !input.is_ascii() {
        return None;
    }
    let (number, unit) = input.split_at(input.len() - 1);
    let value: i64 = number.parse().ok()?;
    if value <= 0 {
        return None;
    }
    match unit {
        "s" => Some(Duration::seconds(value)),
        "m" => Some(Duration::minutes(value)),
        "h" => Some(Duration::hours(value)),
        "d" => Some(Duration::days(value)),
        _ => None,
    }
}

fn default_issuer() -> String {
    "tourhub".to_string()
}

fn default_audience() -> String {
    "tourhub-staff".to_string()
}

fn default_access_lifetime() -> String {
    "15m".to_string()
}

fn default_refresh_days() -> i64 {
    30
}

fn default_revoked_retention() -> i64 {
    7
}

fn default_sentinel_ttl() -> i64 {
    24
}

fn default_max_failed() -> i32 {
    5
}

fn default_lockout() -> i64 {
    120
}

fn default_permission_ttl() -> i64 {
    300
}

fn default_password_min() -> usize {
    8
}

fn default_true() -> bool {
    true
}
