//! bragboard server entry point.
//!
//! Starts the four ingestion jobs and the read-only REST API, and stops both
//! on Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bragboard::api;
use bragboard::app_state::AppState;
use bragboard::config::{BragboardConfig, LogFormat};
use bragboard::jobs::fleet_scheduler;
use bragboard::persistence::Store;
use bragboard::persistence::memory::MemoryStore;
use bragboard::persistence::postgres::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = BragboardConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting bragboard");

    // Build storage
    let store: Arc<dyn Store> = if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to postgres")?;
        store.migrate().await.context("running migrations")?;
        tracing::info!("postgres store ready");
        Arc::new(store)
    } else {
        tracing::warn!("persistence disabled; data is kept in memory only");
        Arc::new(MemoryStore::new())
    };

    // Start ingestion
    let shutdown = CancellationToken::new();
    let jobs = fleet_scheduler(&config, &store)
        .context("building ingestion jobs")?
        .start(shutdown.clone());

    // Build router
    let app_state = AppState {
        store,
        liveness: config.liveness_window(),
    };
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("serving axum")?;

    jobs.shutdown().await;
    tracing::info!("bragboard stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Waits for Ctrl+C or SIGTERM, then cancels the ingestion jobs.
async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown requested");
    shutdown.cancel();
}
