//! # Outpass Request API
//!
//! Resident submission and token retrieval, supervisor decisions and
//! dashboards, and the approved list shared with checkpoint operators.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use outpass_checkpoint::CheckpointToken;
use outpass_core::{PrincipalId, RequestId, Timestamp};
use outpass_service::OutpassSummary;
use outpass_state::{DecisionOutcome, OutpassDraft, OutpassRequest, OutpassStatus};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{JsonBody, PathParam};
use crate::routes::checkpoint::LogEntryResponse;
use crate::state::AppState;

// ── DTOs ─────────────────────────────────────────────────────────────────────

/// Request to submit a new outpass.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOutpassRequest {
    /// Why the resident is leaving.
    pub reason: String,
    /// Where the resident is going.
    pub destination: String,
    /// Requested departure (RFC 3339, any offset).
    pub window_start: DateTime<Utc>,
    /// Requested return deadline (RFC 3339, any offset).
    pub window_end: DateTime<Utc>,
}

/// Lifecycle status as exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusDto {
    Pending,
    Approved,
    Rejected,
}

impl From<OutpassStatus> for StatusDto {
    fn from(status: OutpassStatus) -> Self {
        match status {
            OutpassStatus::Pending => Self::Pending,
            OutpassStatus::Approved => Self::Approved,
            OutpassStatus::Rejected => Self::Rejected,
        }
    }
}

/// An outpass request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OutpassResponse {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub reason: String,
    pub destination: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub status: StatusDto,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OutpassRequest> for OutpassResponse {
    fn from(request: OutpassRequest) -> Self {
        Self {
            id: request.id.0,
            requester_id: request.requester_id.0,
            status: request.status().into(),
            decided_by: request.decided_by().map(|p| p.0),
            decided_at: request.decided_at().map(|t| *t.as_datetime()),
            window_start: *request.window.start().as_datetime(),
            window_end: *request.window.end().as_datetime(),
            created_at: *request.created_at.as_datetime(),
            updated_at: *request.updated_at.as_datetime(),
            reason: request.reason,
            destination: request.destination,
        }
    }
}

fn responses(requests: Vec<OutpassRequest>) -> Json<Vec<OutpassResponse>> {
    Json(requests.into_iter().map(OutpassResponse::from).collect())
}

/// Supervisor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionDto {
    #[serde(alias = "approve")]
    Approved,
    #[serde(alias = "reject")]
    Rejected,
}

/// Request to decide a pending outpass.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecideOutpassRequest {
    pub outcome: DecisionDto,
}

/// Scannable checkpoint token for an approved outpass.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// The payload to render as a code or hand to the operator.
    pub payload: String,
    pub outpass_id: Uuid,
    pub student_id: Uuid,
    pub destination: String,
    pub from_time: DateTime<Utc>,
    pub to_time: DateTime<Utc>,
}

impl From<CheckpointToken> for TokenResponse {
    fn from(token: CheckpointToken) -> Self {
        Self {
            payload: token.to_payload(),
            outpass_id: token.request_id.0,
            student_id: token.requester_id.0,
            from_time: *token.window_start.as_datetime(),
            to_time: *token.window_end.as_datetime(),
            destination: token.destination,
        }
    }
}

/// Supervisor dashboard counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub residents: usize,
}

impl From<OutpassSummary> for SummaryResponse {
    fn from(s: OutpassSummary) -> Self {
        Self {
            total: s.total,
            pending: s.pending,
            approved: s.approved,
            rejected: s.rejected,
            residents: s.residents,
        }
    }
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the outpass router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/outpasses", post(create_outpass))
        .route("/v1/outpasses/mine", get(list_mine))
        .route("/v1/outpasses/pending", get(list_pending))
        .route("/v1/outpasses/approved", get(list_approved))
        .route("/v1/outpasses/summary", get(summary))
        .route("/v1/outpasses/{id}", get(get_outpass))
        .route("/v1/outpasses/{id}/decision", post(decide_outpass))
        .route("/v1/outpasses/{id}/token", get(get_token))
        .route("/v1/outpasses/{id}/logs", get(outpass_logs))
        .route("/v1/residents/{id}/outpasses", get(list_for_resident))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /v1/outpasses: Submit a new outpass request.
#[utoipa::path(
    post,
    path = "/v1/outpasses",
    request_body = CreateOutpassRequest,
    responses(
        (status = 201, description = "Outpass requested", body = OutpassResponse),
        (status = 403, description = "Caller is not a resident", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "outpasses"
)]
pub async fn create_outpass(
    State(state): State<AppState>,
    caller: CallerIdentity,
    JsonBody(req): JsonBody<CreateOutpassRequest>,
) -> Result<(StatusCode, Json<OutpassResponse>), AppError> {
    let resident = caller.resident()?;
    let draft = OutpassDraft {
        reason: req.reason,
        destination: req.destination,
        window_start: Timestamp::from_utc(req.window_start),
        window_end: Timestamp::from_utc(req.window_end),
    };
    let created = state.lifecycle.create(&resident, draft).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// GET /v1/outpasses/mine: The caller's own requests, newest first.
#[utoipa::path(
    get,
    path = "/v1/outpasses/mine",
    responses(
        (status = 200, description = "Caller's requests", body = Vec<OutpassResponse>),
    ),
    tag = "outpasses"
)]
pub async fn list_mine(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<OutpassResponse>>, AppError> {
    let resident = caller.resident()?;
    Ok(responses(state.lifecycle.list_for_requester(&resident).await?))
}

/// GET /v1/outpasses/pending: Requests awaiting a decision.
#[utoipa::path(
    get,
    path = "/v1/outpasses/pending",
    responses(
        (status = 200, description = "Pending requests", body = Vec<OutpassResponse>),
    ),
    tag = "outpasses"
)]
pub async fn list_pending(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<OutpassResponse>>, AppError> {
    let supervisor = caller.supervisor()?;
    Ok(responses(state.lifecycle.list_pending(&supervisor).await?))
}

/// GET /v1/outpasses/approved: Approved requests.
#[utoipa::path(
    get,
    path = "/v1/outpasses/approved",
    responses(
        (status = 200, description = "Approved requests", body = Vec<OutpassResponse>),
    ),
    tag = "outpasses"
)]
pub async fn list_approved(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<OutpassResponse>>, AppError> {
    let reader = caller.approved_reader()?;
    Ok(responses(
        state.lifecycle.list_approved(&*reader).await?,
    ))
}

/// GET /v1/outpasses/summary: Dashboard counters.
#[utoipa::path(
    get,
    path = "/v1/outpasses/summary",
    responses(
        (status = 200, description = "Counters", body = SummaryResponse),
    ),
    tag = "outpasses"
)]
pub async fn summary(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<SummaryResponse>, AppError> {
    let supervisor = caller.supervisor()?;
    Ok(Json(state.lifecycle.summary(&supervisor).await?.into()))
}

/// GET /v1/outpasses/{id}: Fetch one request.
#[utoipa::path(
    get,
    path = "/v1/outpasses/{id}",
    params(("id" = Uuid, Path, description = "Outpass ID")),
    responses(
        (status = 200, description = "Outpass found", body = OutpassResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "outpasses"
)]
pub async fn get_outpass(
    State(state): State<AppState>,
    caller: CallerIdentity,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<OutpassResponse>, AppError> {
    let request = state
        .lifecycle
        .get(caller.identity(), RequestId(id))
        .await?;
    Ok(Json(request.into()))
}

/// POST /v1/outpasses/{id}/decision: Approve or reject a pending request.
#[utoipa::path(
    post,
    path = "/v1/outpasses/{id}/decision",
    params(("id" = Uuid, Path, description = "Outpass ID")),
    request_body = DecideOutpassRequest,
    responses(
        (status = 200, description = "Decision recorded", body = OutpassResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Already decided", body = crate::error::ErrorBody),
    ),
    tag = "outpasses"
)]
pub async fn decide_outpass(
    State(state): State<AppState>,
    caller: CallerIdentity,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<DecideOutpassRequest>,
) -> Result<Json<OutpassResponse>, AppError> {
    let supervisor = caller.supervisor()?;
    let outcome = match req.outcome {
        DecisionDto::Approved => DecisionOutcome::Approved,
        DecisionDto::Rejected => DecisionOutcome::Rejected,
    };
    let decided = state
        .lifecycle
        .decide(&supervisor, RequestId(id), outcome)
        .await?;
    Ok(Json(decided.into()))
}

/// GET /v1/outpasses/{id}/token: Checkpoint token of an approved request.
#[utoipa::path(
    get,
    path = "/v1/outpasses/{id}/token",
    params(("id" = Uuid, Path, description = "Outpass ID")),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not approved", body = crate::error::ErrorBody),
    ),
    tag = "outpasses"
)]
pub async fn get_token(
    State(state): State<AppState>,
    caller: CallerIdentity,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<TokenResponse>, AppError> {
    let resident = caller.resident()?;
    let token = state
        .lifecycle
        .issue_token(&resident, RequestId(id))
        .await?;
    Ok(Json(token.into()))
}

/// GET /v1/outpasses/{id}/logs: Checkpoint movements for one request.
#[utoipa::path(
    get,
    path = "/v1/outpasses/{id}/logs",
    params(("id" = Uuid, Path, description = "Outpass ID")),
    responses(
        (status = 200, description = "Movements, oldest first", body = Vec<LogEntryResponse>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "checkpoint"
)]
pub async fn outpass_logs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Vec<LogEntryResponse>>, AppError> {
    let reader = caller.ledger_reader()?;
    let entries = state
        .verifier
        .entries_for_request(&*reader, RequestId(id))
        .await?;
    Ok(Json(entries.into_iter().map(LogEntryResponse::from).collect()))
}

/// GET /v1/residents/{id}/outpasses: A resident's requests.
#[utoipa::path(
    get,
    path = "/v1/residents/{id}/outpasses",
    params(("id" = Uuid, Path, description = "Resident principal ID")),
    responses(
        (status = 200, description = "Resident's requests", body = Vec<OutpassResponse>),
    ),
    tag = "outpasses"
)]
pub async fn list_for_resident(
    State(state): State<AppState>,
    caller: CallerIdentity,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Vec<OutpassResponse>>, AppError> {
    let supervisor = caller.supervisor()?;
    Ok(responses(
        state
            .lifecycle
            .list_for_resident(&supervisor, PrincipalId(id))
            .await?,
    ))
}
