//! # Checkpoint API
//!
//! Gate scans (scanned or typed payloads) and the recent-movements feed.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use outpass_service::{ScanSource, DEFAULT_RECENT_LIMIT};
use outpass_state::{Direction, LogEntry, MAX_TEXT_LEN};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{QueryParams, Validate, ValidatedJson};
use crate::state::AppState;

/// Upper bound on `?limit=` for the recent feed.
const MAX_RECENT_LIMIT: usize = 100;

// ── DTOs ─────────────────────────────────────────────────────────────────────

/// Movement direction as exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    #[serde(alias = "out")]
    Exit,
    #[serde(alias = "in")]
    Return,
}

impl From<DirectionDto> for Direction {
    fn from(d: DirectionDto) -> Self {
        match d {
            DirectionDto::Exit => Direction::Exit,
            DirectionDto::Return => Direction::Return,
        }
    }
}

impl From<Direction> for DirectionDto {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Exit => DirectionDto::Exit,
            Direction::Return => DirectionDto::Return,
        }
    }
}

/// A checkpoint scan.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    /// The token payload as read from the code or typed by the operator.
    pub payload: String,
    /// Which way the resident is crossing.
    pub direction: DirectionDto,
    /// Whether the payload was typed in rather than scanned.
    #[serde(default)]
    pub manual: bool,
    /// Optional operator remark.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for ScanRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_TEXT_LEN {
                return Err(format!("notes must not exceed {MAX_TEXT_LEN} characters"));
            }
        }
        Ok(())
    }
}

/// A recorded checkpoint movement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogEntryResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub resident_id: Uuid,
    pub direction: DirectionDto,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub is_late: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<LogEntry> for LogEntryResponse {
    fn from(entry: LogEntry) -> Self {
        Self {
            id: entry.id.0,
            request_id: entry.request_id.0,
            resident_id: entry.resident_id.0,
            direction: entry.direction.into(),
            recorded_by: entry.recorded_by.0,
            recorded_at: *entry.recorded_at.as_datetime(),
            is_late: entry.is_late,
            notes: entry.notes,
        }
    }
}

/// Query parameters for the recent feed.
#[derive(Debug, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentLogsQuery {
    /// Maximum number of entries (default 10, max 100).
    pub limit: Option<usize>,
}

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the checkpoint router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/checkpoint/scans", post(record_scan))
        .route("/v1/checkpoint/logs", get(recent_logs))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /v1/checkpoint/scans: Verify a token and record the movement.
#[utoipa::path(
    post,
    path = "/v1/checkpoint/scans",
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Movement recorded", body = LogEntryResponse),
        (status = 404, description = "Outpass not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not approved or out of sequence", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed or mismatched token", body = crate::error::ErrorBody),
    ),
    tag = "checkpoint"
)]
pub async fn record_scan(
    State(state): State<AppState>,
    caller: CallerIdentity,
    ValidatedJson(req): ValidatedJson<ScanRequest>,
) -> Result<(StatusCode, Json<LogEntryResponse>), AppError> {
    let operator = caller.checkpoint_operator()?;
    let source = if req.manual {
        ScanSource::Manual
    } else {
        ScanSource::Scanned
    };
    let entry = state
        .verifier
        .scan(&operator, &req.payload, source, req.direction.into(), req.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

/// GET /v1/checkpoint/logs: Latest movements, newest first.
#[utoipa::path(
    get,
    path = "/v1/checkpoint/logs",
    params(RecentLogsQuery),
    responses(
        (status = 200, description = "Recent movements", body = Vec<LogEntryResponse>),
    ),
    tag = "checkpoint"
)]
pub async fn recent_logs(
    State(state): State<AppState>,
    caller: CallerIdentity,
    QueryParams(query): QueryParams<RecentLogsQuery>,
) -> Result<Json<Vec<LogEntryResponse>>, AppError> {
    let reader = caller.ledger_reader()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let entries = state.verifier.recent(&*reader, Some(limit)).await?;
    Ok(Json(entries.into_iter().map(LogEntryResponse::from).collect()))
}
