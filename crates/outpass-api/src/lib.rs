//! # outpass-api: Axum API Service
//!
//! HTTP surface for the Outpass Stack, built on Axum/Tower/Tokio.
//!
//! ## Routes
//!
//! - `/v1/outpasses/*`: resident submissions, supervisor decisions and
//!   dashboards, checkpoint tokens, per-request movement history
//! - `/v1/residents/{id}/outpasses`: supervisor view of one resident
//! - `/v1/checkpoint/*`: gate scans and the recent-movements feed
//! - `/openapi.json`: generated OpenAPI document
//! - `/health/*`: Kubernetes health probes (unauthenticated)
//! - `/metrics`: Prometheus exposition (unauthenticated)
//!
//! ## Middleware Stack (Tower)
//!
//! TraceLayer → MetricsLayer → AuthLayer
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers; they delegate to `outpass-service`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::outpasses::router())
        .merge(routes::checkpoint::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated probes and scrape endpoint.
    let open = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::render))
        .with_state(state);

    Router::new().merge(open).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
