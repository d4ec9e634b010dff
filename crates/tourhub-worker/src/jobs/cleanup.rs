//! Expired-record cleanup and blacklist pruning.

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use tourhub_auth::blacklist::TokenBlacklist;
use tourhub_auth::refresh::RefreshTokenStore;
use tourhub_core::clock::Clock;
use tourhub_core::config::worker::WorkerConfig;
use tourhub_core::result::AppResult;

/// Removes rows the stores no longer need.
///
/// Both passes are idempotent and safe to run with nothing to delete,
/// so overlapping runs are harmless.
#[derive(Debug, Clone)]
pub struct CleanupJob {
    /// Refresh credential store.
    refresh_store: Arc<RefreshTokenStore>,
    /// Access token blacklist.
    blacklist: Arc<TokenBlacklist>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// How far back the daily prune reaches.
    prune_horizon: Duration,
}

impl CleanupJob {
    /// Creates a new cleanup job.
    pub fn new(
        refresh_store: Arc<RefreshTokenStore>,
        blacklist: Arc<TokenBlacklist>,
        clock: Arc<dyn Clock>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            refresh_store,
            blacklist,
            clock,
            prune_horizon: config.blacklist_prune_horizon(),
        }
    }

    /// Hourly pass: delete expired refresh records (plus revoked ones
    /// past retention) and expired blacklist rows.
    pub async fn run_expired_cleanup(&self) -> AppResult<()> {
        let refresh_removed = self.refresh_store.cleanup().await?;
        let blacklist_removed = self.blacklist.cleanup().await?;

        info!(
            refresh_removed,
            blacklist_removed, "Expired credential cleanup completed"
        );
        Ok(())
    }

    /// Daily pass: drop blacklist rows older than the prune horizon
    /// regardless of expiry.
    pub async fn run_blacklist_prune(&self) -> AppResult<()> {
        let cutoff = self.clock.now() - self.prune_horizon;
        let removed = self.blacklist.prune_created_before(cutoff).await?;

        info!(removed, %cutoff, "Blacklist prune completed");
        Ok(())
    }
}
