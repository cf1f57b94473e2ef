//! # outpass-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Outpass Stack API.
//! Binds to configurable port (default 8080).

use outpass_api::middleware::metrics::install_recorder;
use outpass_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build configuration from environment.
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "configuration loaded");

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = outpass_store::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let port = config.port;
    let mut state = AppState::with_config(config, db_pool);
    match install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!("{e}; /metrics disabled"),
    }

    let app = outpass_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Outpass API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
