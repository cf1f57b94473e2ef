//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Outpass API",
        version = "0.1.0",
        description = "Temporary-leave requests, supervisor decisions, and checkpoint exit/return logging.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::outpasses::create_outpass,
        crate::routes::outpasses::list_mine,
        crate::routes::outpasses::list_pending,
        crate::routes::outpasses::list_approved,
        crate::routes::outpasses::summary,
        crate::routes::outpasses::get_outpass,
        crate::routes::outpasses::decide_outpass,
        crate::routes::outpasses::get_token,
        crate::routes::outpasses::outpass_logs,
        crate::routes::outpasses::list_for_resident,
        crate::routes::checkpoint::record_scan,
        crate::routes::checkpoint::recent_logs,
    ),
    components(schemas(
        crate::routes::outpasses::CreateOutpassRequest,
        crate::routes::outpasses::OutpassResponse,
        crate::routes::outpasses::StatusDto,
        crate::routes::outpasses::DecisionDto,
        crate::routes::outpasses::DecideOutpassRequest,
        crate::routes::outpasses::TokenResponse,
        crate::routes::outpasses::SummaryResponse,
        crate::routes::checkpoint::DirectionDto,
        crate::routes::checkpoint::ScanRequest,
        crate::routes::checkpoint::LogEntryResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "outpasses", description = "Outpass request lifecycle"),
        (name = "checkpoint", description = "Gate scans and movement ledger"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
