//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use tourhub_core::error::AppError;

use crate::jobs::{AnomalyScan, CleanupJob};

/// Cron-based scheduler for the maintenance jobs.
///
/// Each timer is independent; a job catches and logs its own failures,
/// so one bad tick never stops the loop or its siblings.
pub struct MaintenanceScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Cleanup job shared by the hourly and daily timers
    cleanup: Arc<CleanupJob>,
    /// Anomaly scan job
    anomaly: Arc<AnomalyScan>,
}

impl std::fmt::Debug for MaintenanceScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceScheduler").finish()
    }
}

impl MaintenanceScheduler {
    /// Create a new maintenance scheduler
    pub async fn new(cleanup: Arc<CleanupJob>, anomaly: Arc<AnomalyScan>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            cleanup,
            anomaly,
        })
    }

    /// Register all default scheduled tasks
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_expired_cleanup().await?;
        self.register_blacklist_prune().await?;
        self.register_anomaly_scan().await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Maintenance scheduler shut down");
        Ok(())
    }

    /// Expired-record cleanup — every hour
    async fn register_expired_cleanup(&self) -> Result<(), AppError> {
        let cleanup = Arc::clone(&self.cleanup);
        let job = CronJob::new_async("0 0 * * * *", move |_uuid, _lock| {
            let cleanup = Arc::clone(&cleanup);
            Box::pin(async move {
                tracing::debug!("Running expired credential cleanup");
                if let Err(e) = cleanup.run_expired_cleanup().await {
                    tracing::error!("Expired credential cleanup failed: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create expired_cleanup schedule: {}", e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add expired_cleanup schedule: {}", e))
        })?;

        tracing::info!("Registered: expired_cleanup (every hour)");
        Ok(())
    }

    /// Blacklist prune — every day at 3 AM
    async fn register_blacklist_prune(&self) -> Result<(), AppError> {
        let cleanup = Arc::clone(&self.cleanup);
        let job = CronJob::new_async("0 0 3 * * *", move |_uuid, _lock| {
            let cleanup = Arc::clone(&cleanup);
            Box::pin(async move {
                tracing::debug!("Running blacklist prune");
                if let Err(e) = cleanup.run_blacklist_prune().await {
                    tracing::error!("Blacklist prune failed: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create blacklist_prune schedule: {}", e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add blacklist_prune schedule: {}", e))
        })?;

        tracing::info!("Registered: blacklist_prune (daily at 3AM)");
        Ok(())
    }

    /// Anomaly scan — every six hours
    async fn register_anomaly_scan(&self) -> Result<(), AppError> {
        let anomaly = Arc::clone(&self.anomaly);
        let job = CronJob::new_async("0 0 */6 * * *", move |_uuid, _lock| {
            let anomaly = Arc::clone(&anomaly);
            Box::pin(async move {
                tracing::debug!("Running anomaly scan");
                if let Err(e) = anomaly.run().await {
                    tracing::error!("Anomaly scan failed: {}", e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create anomaly_scan schedule: {}", e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add anomaly_scan schedule: {}", e))
        })?;

        tracing::info!("Registered: anomaly_scan (every 6h)");
        Ok(())
    }
}
