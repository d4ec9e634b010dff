//! TourHub Auth Server — authentication & session lifecycle core.
//!
//! Main entry point that wires all crates together and runs the
//! maintenance scheduler until shutdown.

use std::sync::Arc;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use tourhub_core::clock::{Clock, SystemClock};
use tourhub_core::config::AppConfig;
use tourhub_core::error::AppError;

#[tokio::main]
async fn main() {
    let env = std::env::var("TOURHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TourHub auth core v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = tourhub_database::connection::DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    tourhub_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let staff_repo: Arc<dyn tourhub_database::repositories::StaffRepository> = Arc::new(
        tourhub_database::repositories::PgStaffRepository::new(db.pool().clone()),
    );
    let refresh_repo: Arc<dyn tourhub_database::repositories::RefreshTokenRepository> = Arc::new(
        tourhub_database::repositories::PgRefreshTokenRepository::new(db.pool().clone()),
    );
    let blacklist_repo: Arc<dyn tourhub_database::repositories::BlacklistRepository> = Arc::new(
        tourhub_database::repositories::PgBlacklistRepository::new(db.pool().clone()),
    );

    // ── Step 3: Auth components ──────────────────────────────────
    tracing::info!("Initializing authentication system...");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // The signing secret is validated here, at startup, never per call.
    let issuer = Arc::new(tourhub_auth::token::TokenIssuer::new(
        &config.auth,
        clock.clone(),
    )?);
    let blacklist = Arc::new(tourhub_auth::blacklist::TokenBlacklist::new(
        blacklist_repo,
        clock.clone(),
        &config.auth,
    ));
    let verifier = Arc::new(tourhub_auth::token::TokenVerifier::new(
        &config.auth,
        blacklist.clone(),
    ));
    let refresh_store = Arc::new(tourhub_auth::refresh::RefreshTokenStore::new(
        refresh_repo.clone(),
        clock.clone(),
        &config.auth,
    ));
    let lockout = Arc::new(tourhub_auth::lockout::LockoutGuard::new(
        staff_repo.clone(),
        clock.clone(),
        &config.auth,
    ));
    let permissions = Arc::new(tourhub_auth::permission::PermissionCache::new(
        Arc::new(tourhub_auth::permission::StaffPermissionSource::new(
            staff_repo.clone(),
        )),
        clock.clone(),
        config.auth.permission_cache_ttl(),
    ));
    let hasher = Arc::new(tourhub_auth::password::PasswordHasher::new());

    let _coordinator = Arc::new(tourhub_auth::session::SessionLifecycleCoordinator::new(
        staff_repo,
        issuer,
        verifier,
        refresh_store.clone(),
        blacklist.clone(),
        lockout,
        permissions,
        hasher,
        clock.clone(),
        &config.auth,
    ));
    tracing::info!("Authentication system initialized");

    // ── Step 4: Maintenance scheduler ────────────────────────────
    let mut scheduler = if config.worker.enabled {
        tracing::info!("Starting maintenance scheduler...");

        let cleanup = Arc::new(tourhub_worker::jobs::CleanupJob::new(
            refresh_store,
            blacklist,
            clock.clone(),
            &config.worker,
        ));
        let anomaly = Arc::new(tourhub_worker::jobs::AnomalyScan::new(
            refresh_repo,
            clock,
            config.worker.clone(),
        ));

        let scheduler = tourhub_worker::MaintenanceScheduler::new(cleanup, anomaly).await?;
        scheduler.register_default_tasks().await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Maintenance scheduler disabled");
        None
    };

    tracing::info!("TourHub auth core running");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    db.close().await;

    tracing::info!("TourHub auth core shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
