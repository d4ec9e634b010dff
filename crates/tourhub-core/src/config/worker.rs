//! Background maintenance configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Settings for the maintenance scheduler and its anomaly scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the maintenance scheduler runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Blacklist rows older than this many days are pruned by the daily job.
    #[serde(default = "default_prune_days")]
    pub blacklist_prune_days: i64,
    /// Sliding window for anomaly counting, in minutes.
    #[serde(default = "default_anomaly_window")]
    pub anomaly_window_minutes: i64,
    /// Refresh-token creations from a single IP within the window that
    /// trigger a flag.
    #[serde(default = "default_ip_threshold")]
    pub refresh_creation_ip_threshold: i64,
    /// Security-reason revocations for a single principal within the window
    /// that trigger a flag.
    #[serde(default = "default_revocation_threshold")]
    pub security_revocation_threshold: i64,
    /// Usage count above which a refresh record is flagged as abnormal.
    #[serde(default = "default_usage_threshold")]
    pub high_usage_threshold: i32,
}

impl WorkerConfig {
    /// Resolved anomaly counting window.
    pub fn anomaly_window(&self) -> Duration {
        Duration::minutes(self.anomaly_window_minutes)
    }

    /// Resolved blacklist prune horizon.
    pub fn blacklist_prune_horizon(&self) -> Duration {
        Duration::days(self.blacklist_prune_days)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blacklist_prune_days: default_prune_days(),
            anomaly_window_minutes: default_anomaly_window(),
            refresh_creation_ip_threshold: default_ip_threshold(),
            security_revocation_threshold: default_revocation_threshold(),
            high_usage_threshold: default_usage_threshold(),
        }
    }
}

fn default_prune_days() -> i64 {
    30
}

fn default_anomaly_window() -> i64 {
    60
}

fn default_ip_threshold() -> i64 {
    20
}

fn default_revocation_threshold() -> i64 {
    5
}

fn default_usage_threshold() -> i32 {
    100
}

fn default_true() -> bool {
    true
}
