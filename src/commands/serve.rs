//! Serve command - Starts the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::{Config, PUSH_CHANNEL_CAPACITY};
use crate::errors::{AppError, AppResult};
use crate::infra::{reminder_storage, Cache, Database, JobQueue, LockManager, NotificationHub};
use crate::services::Backends;

/// Execute the serve command
pub async fn execute(args: ServeArgs, mut config: Config) -> AppResult<()> {
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }

    tracing::info!("Starting server...");

    let db = Database::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;
    let db = Arc::new(db);

    let cache = Cache::connect(&config)
        .await
        .map_err(|e| AppError::internal(format!("Redis connection failed: {}", e)))?;
    let cache = Arc::new(cache);

    let pool = super::job_pool(&config).await?;
    let reminders = JobQueue::new(reminder_storage(pool).await?);
    tracing::info!("Job queue ready");

    let hub = Arc::new(NotificationHub::new(PUSH_CHANNEL_CAPACITY));
    let locks: Arc<dyn LockManager> = cache.clone();
    let backends = Backends {
        locks,
        hub,
        reminders: Arc::new(reminders),
    };

    let addr = config.server_addr();
    let app_state = AppState::from_config(db, cache, config, backends);
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);

    // peer addresses feed the rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, draining connections...");
}
