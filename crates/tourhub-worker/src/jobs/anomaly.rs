//! Credential anomaly scan.
//!
//! Detection only logs and flags; it is not safety-critical and a
//! failed scan must not disturb anything else.

use std::sync::Arc;

use tracing::{info, warn};

use tourhub_core::clock::Clock;
use tourhub_core::config::worker::WorkerConfig;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::RefreshTokenRepository;

/// Summary of one scan, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnomalyReport {
    /// IPs that created an excessive number of refresh tokens.
    pub creation_hotspots: usize,
    /// Principals with excessive security-reason revocations.
    pub revocation_hotspots: usize,
    /// Refresh records with abnormally high usage counts.
    pub high_usage_records: usize,
}

/// Flags suspicious refresh-token activity.
#[derive(Debug, Clone)]
pub struct AnomalyScan {
    /// Refresh token persistence, queried directly for aggregates.
    refresh_repo: Arc<dyn RefreshTokenRepository>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Scan thresholds and window.
    config: WorkerConfig,
}

impl AnomalyScan {
    /// Creates a new scan with the configured thresholds.
    pub fn new(
        refresh_repo: Arc<dyn RefreshTokenRepository>,
        clock: Arc<dyn Clock>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            refresh_repo,
            clock,
            config,
        }
    }

    /// Runs all three checks and logs what they flag.
    pub async fn run(&self) -> AppResult<AnomalyReport> {
        let since = self.clock.now() - self.config.anomaly_window();
        let mut report = AnomalyReport::default();

        let hotspots = self
            .refresh_repo
            .creation_hotspots(since, self.config.refresh_creation_ip_threshold)
            .await?;
        for hotspot in &hotspots {
            warn!(
                target: "audit",
                ip = %hotspot.ip_address,
                created = hotspot.created,
                window_minutes = self.config.anomaly_window_minutes,
                "Excessive refresh token creation from one IP"
            );
        }
        report.creation_hotspots = hotspots.len();

        let revocations = self
            .refresh_repo
            .security_revocation_hotspots(since, self.config.security_revocation_threshold)
            .await?;
        for entry in &revocations {
            warn!(
                target: "audit",
                principal_id = %entry.principal_id,
                revoked = entry.revoked,
                window_minutes = self.config.anomaly_window_minutes,
                "Excessive security revocations for one principal"
            );
        }
        report.revocation_hotspots = revocations.len();

        let high_usage = self
            .refresh_repo
            .find_high_usage(self.config.high_usage_threshold)
            .await?;
        for record in &high_usage {
            warn!(
                target: "audit",
                record_id = %record.id,
                principal_id = %record.principal_id,
                usage_count = record.usage_count,
                "Refresh token with abnormally high usage"
            );
        }
        report.high_usage_records = high_usage.len();

        info!(
            creation_hotspots = report.creation_hotspots,
            revocation_hotspots = report.revocation_hotspots,
            high_usage_records = report.high_usage_records,
            "Anomaly scan completed"
        );

        Ok(report)
    }
}
