//! Server startup, shutdown, and worker spawning logic.

use crate::cache::Cache;
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, AppResult};
use crate::jobs::{create_job_channel, Worker, WorkerConfig};
use crate::registry::Registry;
use crate::routes;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Connect the optional Redis cache; a failed ping disables it for this run.
async fn connect_cache(config: &Config) -> AppResult<Option<Cache>> {
    if !config.cache.enabled {
        info!("Cache disabled");
        return Ok(None);
    }

    info!("Connecting to cache...");
    let cache = Cache::new(
        &config.cache.url,
        config.cache.max_connections,
        config.cache.default_ttl_seconds,
    )?;

    match cache.ping().await {
        Ok(_) => {
            info!("Cache connection verified");
            Ok(Some(cache))
        }
        Err(e) => {
            warn!(error = %e, "Cache ping failed, continuing without cache");
            Ok(None)
        }
    }
}

/// Run the web server with the given configuration.
///
/// Connects to PostgreSQL (and Redis when enabled), optionally runs
/// migrations, starts the background worker and serves until a shutdown
/// signal arrives. Queued jobs are drained before returning.
///
/// # Errors
///
/// Returns an error if the database is unreachable, a migration fails, or the
/// listener cannot bind to `addr`.
pub async fn run_server(config: Config, addr: String, should_migrate: bool) -> AppResult<()> {
    info!("Starting qrfast server...");

    info!("Connecting to database...");
    let repository = Arc::new(
        Repository::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
            config.database.acquire_timeout_seconds,
        )
        .await?,
    );

    if should_migrate {
        info!("Running database migrations...");
        repository.run_migrations().await?;
        info!("Migrations completed successfully");
    }

    let cache = connect_cache(&config).await?;

    let (job_sender, job_receiver) = create_job_channel();
    let worker_registry = Registry::new(
        repository.clone(),
        config.links.short_code_length,
        config.links.short_code_max_attempts,
    );
    let worker = Worker::new(worker_registry, repository.clone(), job_receiver)
        .with_config(WorkerConfig::from(&config.jobs));
    let worker_handle = tokio::spawn(worker.run());

    let state = Arc::new(AppState::build(
        repository.clone(),
        repository,
        cache,
        job_sender,
        &config,
    ));

    let app = routes::create_router(state, &config.cors, &config.rate_limit)?;

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to address {}: {}", addr, e)))?;

    info!("Server listening on {}", addr);
    info!("Base URL: {}", config.links.base_url);

    // Serving consumes the router, and with it the last job sender.
    // Peer addresses key the API rate limiter for clients without proxy headers.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(create_shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    info!("Draining background jobs...");
    worker_handle.await.unwrap_or_else(|e| {
        error!("Worker task failed: {:?}", e);
    });

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is ignored.
async fn create_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    ctrl_c.await;

    info!("Shutdown signal received");
}
