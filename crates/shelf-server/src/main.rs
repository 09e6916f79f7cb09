//! Shelf Server - Main entry point

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::Router;
use shelf_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::info;

use shelf_server::{
    api::{self, AppState},
    audit::{PgAuditStore, PolicyRegistry},
    config::Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("shelf-server".to_string())
        .filter_directives("shelf_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&log_config)?;

    info!("Starting Shelf Server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        audit_capture = config.audit.capture_enabled,
        "Configuration loaded"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    info!("Database migrations completed");

    let policies = PolicyRegistry::inventory_defaults();
    info!(policies = policies.len(), "Audit policies registered");

    let state = AppState {
        db: db_pool.clone(),
        audit_store: Arc::new(PgAuditStore::new(db_pool)),
        policies,
    };

    // Inventory resource routes are mounted by the embedding deployment
    let app = api::router(state, &config, Router::new());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
    .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Detached audit writes get the same grace period as in-flight requests
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
