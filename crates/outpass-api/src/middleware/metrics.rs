//! # Prometheus Metrics
//!
//! Per-response counters recorded through the `metrics` facade and
//! rendered by the Prometheus exporter at `/metrics`. When no recorder is
//! installed (tests, embedded use) the counters are no-ops.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::AppError;
use crate::state::AppState;

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus recorder: {e}"))
}

/// Middleware that counts responses by method and status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let response = next.run(request).await;

    metrics::counter!(
        "http_requests_total",
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    if response.status().is_server_error() {
        metrics::counter!("http_server_errors_total").increment(1);
    }

    response
}

/// GET /metrics: Prometheus text exposition.
pub async fn render(State(state): State<AppState>) -> Result<Response, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics exporter not installed".into()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
