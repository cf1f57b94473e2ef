//! # Integration Tests for outpass-api
//!
//! Drives the assembled router end to end: resident submission, supervisor
//! decisions, token issuance, checkpoint scans with the late-return rule,
//! ledger queries, authentication, error mapping, health probes and the
//! OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use outpass_api::state::{AppConfig, AppState};
use outpass_core::{ManualClock, Timestamp};
use outpass_state::DirectionPolicy;
use outpass_store::{MemoryLogLedger, MemoryRequestStore};

const RESIDENT: &str = "11111111-1111-4111-8111-111111111111";
const OTHER_RESIDENT: &str = "22222222-2222-4222-8222-222222222222";
const SUPERVISOR: &str = "33333333-3333-4333-8333-333333333333";
const OPERATOR: &str = "44444444-4444-4444-8444-444444444444";

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

/// Helper: app over in-memory stores with a clock frozen at 10:00.
fn test_app_with(config: AppConfig) -> (axum::Router, ManualClock) {
    let clock = ManualClock::new(ts("2024-01-01T10:00:00Z"));
    let state = AppState::with_parts(
        config,
        Arc::new(MemoryRequestStore::new()),
        Arc::new(MemoryLogLedger::new()),
        Arc::new(clock.clone()),
    );
    (outpass_api::app(state), clock)
}

fn test_app() -> (axum::Router, ManualClock) {
    test_app_with(AppConfig::default())
}

fn bearer(role: &str, principal: &str) -> String {
    format!("Bearer {role}:{principal}:dev")
}

/// Helper: send a request and decode the JSON response body.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    auth: Option<String>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn city_center() -> Value {
    json!({
        "reason": "Family visit",
        "destination": "City Center",
        "window_start": "2024-01-01T14:00:00Z",
        "window_end": "2024-01-01T18:00:00Z",
    })
}

async fn create(app: &axum::Router, resident: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/v1/outpasses",
        Some(bearer("resident", resident)),
        Some(city_center()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn approve(app: &axum::Router, id: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/v1/outpasses/{id}/decision"),
        Some(bearer("supervisor", SUPERVISOR)),
        Some(json!({ "outcome": "approved" })),
    )
    .await
}

async fn token_payload(app: &axum::Router, id: &str) -> String {
    let (status, body) = send(
        app,
        "GET",
        &format!("/v1/outpasses/{id}/token"),
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["payload"].as_str().unwrap().to_string()
}

async fn scan(app: &axum::Router, payload: &str, direction: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/v1/checkpoint/scans",
        Some(bearer("checkpoint_operator", OPERATOR)),
        Some(json!({ "payload": payload, "direction": direction })),
    )
    .await
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes_need_no_auth() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
    let (status, body) = send(&app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ready".into()));
}

#[tokio::test]
async fn test_metrics_not_found_without_recorder() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// -- Full Lifecycle -----------------------------------------------------------

#[tokio::test]
async fn test_request_approve_exit_and_late_return() {
    let (app, clock) = test_app();

    let (status, created) = send(
        &app,
        "POST",
        "/v1/outpasses",
        Some(bearer("student", RESIDENT)),
        Some(city_center()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["requester_id"], RESIDENT);
    assert!(created["decided_by"].is_null());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, pending) = send(
        &app,
        "GET",
        "/v1/outpasses/pending",
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, decided) = approve(&app, &id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "approved");
    assert_eq!(decided["decided_by"], SUPERVISOR);

    let payload = token_payload(&app, &id).await;

    clock.set(ts("2024-01-01T14:10:00Z"));
    let (status, exit) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::CREATED, "{exit}");
    assert_eq!(exit["direction"], "exit");
    assert_eq!(exit["is_late"], false);
    assert_eq!(exit["recorded_by"], OPERATOR);

    clock.set(ts("2024-01-01T19:00:00Z"));
    let (status, ret) = scan(&app, &payload, "return").await;
    assert_eq!(status, StatusCode::CREATED, "{ret}");
    assert_eq!(ret["direction"], "return");
    assert_eq!(ret["is_late"], true);

    let (status, logs) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{id}/logs"),
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["direction"], "exit");
    assert_eq!(logs[1]["direction"], "return");

    let (status, recent) = send(
        &app,
        "GET",
        "/v1/checkpoint/logs?limit=1",
        Some(bearer("guard", OPERATOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let recent = recent.as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["direction"], "return");
}

#[tokio::test]
async fn test_return_at_window_end_is_on_time() {
    let (app, clock) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;

    clock.set(ts("2024-01-01T18:00:00Z"));
    let (status, entry) = scan(&app, &payload, "in").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["direction"], "return");
    assert_eq!(entry["is_late"], false);
}

#[tokio::test]
async fn test_manual_entry_tolerates_whitespace() {
    let (app, clock) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;
    clock.set(ts("2024-01-01T14:30:00Z"));

    let (status, entry) = send(
        &app,
        "POST",
        "/v1/checkpoint/scans",
        Some(bearer("checkpoint_operator", OPERATOR)),
        Some(json!({
            "payload": format!("  {payload}\n"),
            "direction": "out",
            "manual": true,
            "notes": "typed at gate 2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{entry}");
    assert_eq!(entry["notes"], "typed at gate 2");
}

#[tokio::test]
async fn test_oversized_scan_notes_are_rejected() {
    let (app, _clock) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/checkpoint/scans",
        Some(bearer("checkpoint_operator", OPERATOR)),
        Some(json!({
            "payload": payload,
            "direction": "exit",
            "notes": "x".repeat(10_000),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_token_response_exposes_payload_fields() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let (status, token) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{id}/token"),
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["outpass_id"], id.as_str());
    assert_eq!(token["student_id"], RESIDENT);
    assert_eq!(token["destination"], "City Center");
    let payload: Value = serde_json::from_str(token["payload"].as_str().unwrap()).unwrap();
    assert_eq!(payload["outpass_id"], id.as_str());
    assert_eq!(payload["to_time"], "2024-01-01T18:00:00Z");
}

// -- Decisions ----------------------------------------------------------------

#[tokio::test]
async fn test_second_decision_conflicts() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    let (status, _) = approve(&app, &id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/outpasses/{id}/decision"),
        Some(bearer("admin", SUPERVISOR)),
        Some(json!({ "outcome": "reject" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
}

#[tokio::test]
async fn test_resident_cannot_decide() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/outpasses/{id}/decision"),
        Some(bearer("resident", RESIDENT)),
        Some(json!({ "outcome": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_decide_unknown_request_is_not_found() {
    let (app, _) = test_app();
    let (status, body) = approve(&app, &Uuid::new_v4().to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_rejected_request_has_no_token() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    send(
        &app,
        "POST",
        &format!("/v1/outpasses/{id}/decision"),
        Some(bearer("supervisor", SUPERVISOR)),
        Some(json!({ "outcome": "rejected" })),
    )
    .await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{id}/token"),
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_APPROVED");
}

// -- Submission Validation ----------------------------------------------------

#[tokio::test]
async fn test_inverted_window_is_rejected() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/outpasses",
        Some(bearer("resident", RESIDENT)),
        Some(json!({
            "reason": "Family visit",
            "destination": "City Center",
            "window_start": "2024-01-01T18:00:00Z",
            "window_end": "2024-01-01T14:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_blank_destination_is_rejected() {
    let (app, _) = test_app();
    let mut draft = city_center();
    draft["destination"] = json!("   ");
    let (status, body) = send(
        &app,
        "POST",
        "/v1/outpasses",
        Some(bearer("resident", RESIDENT)),
        Some(draft),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unparseable_body_is_bad_request() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/outpasses",
        Some(bearer("resident", RESIDENT)),
        Some(json!({ "reason": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_supervisor_cannot_submit() {
    let (app, _) = test_app();
    let (status, _) = send(
        &app,
        "POST",
        "/v1/outpasses",
        Some(bearer("supervisor", SUPERVISOR)),
        Some(city_center()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Visibility ---------------------------------------------------------------

#[tokio::test]
async fn test_residents_only_see_their_own_requests() {
    let (app, _) = test_app();
    let mine = create(&app, RESIDENT).await;
    let theirs = create(&app, OTHER_RESIDENT).await;

    let (status, list) = send(
        &app,
        "GET",
        "/v1/outpasses/mine",
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], mine.as_str());

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{theirs}"),
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{theirs}"),
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_supervisor_views_one_resident_and_summary() {
    let (app, _) = test_app();
    let first = create(&app, RESIDENT).await;
    create(&app, RESIDENT).await;
    create(&app, OTHER_RESIDENT).await;
    approve(&app, &first).await;

    let (status, list) = send(
        &app,
        "GET",
        &format!("/v1/residents/{RESIDENT}/outpasses"),
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, summary) = send(
        &app,
        "GET",
        "/v1/outpasses/summary",
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["pending"], 2);
    assert_eq!(summary["approved"], 1);
    assert_eq!(summary["rejected"], 0);
    assert_eq!(summary["residents"], 2);
}

#[tokio::test]
async fn test_approved_list_is_shared_with_operators_only() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    create(&app, RESIDENT).await;
    approve(&app, &id).await;

    let (status, list) = send(
        &app,
        "GET",
        "/v1/outpasses/approved",
        Some(bearer("checkpoint_operator", OPERATOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id.as_str());

    let (status, _) = send(
        &app,
        "GET",
        "/v1/outpasses/approved",
        Some(bearer("resident", RESIDENT)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// -- Checkpoint Failures ------------------------------------------------------

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let (app, _) = test_app();
    let (status, body) = scan(&app, "not a token", "exit").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "MALFORMED_TOKEN");
}

#[tokio::test]
async fn test_scan_of_pending_request_is_not_approved() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    let payload = json!({
        "outpass_id": id,
        "student_id": RESIDENT,
        "destination": "City Center",
        "from_time": "2024-01-01T14:00:00Z",
        "to_time": "2024-01-01T18:00:00Z",
    })
    .to_string();
    let (status, body) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "NOT_APPROVED");
}

#[tokio::test]
async fn test_forged_resident_is_token_mismatch() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = json!({
        "outpass_id": id,
        "student_id": OTHER_RESIDENT,
        "destination": "City Center",
        "from_time": "2024-01-01T14:00:00Z",
        "to_time": "2024-01-01T18:00:00Z",
    })
    .to_string();
    let (status, body) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "TOKEN_MISMATCH");
}

#[tokio::test]
async fn test_unknown_request_in_token_is_not_found() {
    let (app, _) = test_app();
    let payload = json!({
        "outpass_id": Uuid::new_v4(),
        "student_id": RESIDENT,
        "destination": "City Center",
        "from_time": "2024-01-01T14:00:00Z",
        "to_time": "2024-01-01T18:00:00Z",
    })
    .to_string();
    let (status, _) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_operators_scan() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;
    let (status, _) = send(
        &app,
        "POST",
        "/v1/checkpoint/scans",
        Some(bearer("supervisor", SUPERVISOR)),
        Some(json!({ "payload": payload, "direction": "exit" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_alternating_policy_rejects_double_exit() {
    let config = AppConfig {
        direction_policy: DirectionPolicy::Alternating,
        ..AppConfig::default()
    };
    let (app, _) = test_app_with(config);
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;

    let (status, _) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = scan(&app, &payload, "exit").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OUT_OF_SEQUENCE");
}

#[tokio::test]
async fn test_permissive_policy_accepts_double_exit() {
    let (app, _) = test_app();
    let id = create(&app, RESIDENT).await;
    approve(&app, &id).await;
    let payload = token_payload(&app, &id).await;

    assert_eq!(scan(&app, &payload, "exit").await.0, StatusCode::CREATED);
    assert_eq!(scan(&app, &payload, "exit").await.0, StatusCode::CREATED);
}

#[tokio::test]
async fn test_logs_for_unknown_request_is_not_found() {
    let (app, _) = test_app();
    let (status, _) = send(
        &app,
        "GET",
        &format!("/v1/outpasses/{}/logs", Uuid::new_v4()),
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_path_id_is_json_bad_request() {
    let (app, _) = test_app();
    for uri in [
        "/v1/outpasses/not-a-uuid",
        "/v1/outpasses/not-a-uuid/logs",
        "/v1/residents/not-a-uuid/outpasses",
    ] {
        let (status, body) = send(
            &app,
            "GET",
            uri,
            Some(bearer("supervisor", SUPERVISOR)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["code"], "BAD_REQUEST", "{uri}: {body}");
    }
}

#[tokio::test]
async fn test_malformed_limit_is_json_bad_request() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        "GET",
        "/v1/checkpoint/logs?limit=abc",
        Some(bearer("checkpoint_operator", OPERATOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST", "{body}");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_missing_authorization_is_unauthorized() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/v1/outpasses/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_configured_secret_is_enforced() {
    let (app, _) = test_app_with(AppConfig {
        auth_token: Some("s3cret".into()),
        ..AppConfig::default()
    });
    let (status, _) = send(
        &app,
        "GET",
        "/v1/outpasses/mine",
        Some(format!("Bearer resident:{RESIDENT}:wrong")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "GET",
        "/v1/outpasses/mine",
        Some(format!("Bearer resident:{RESIDENT}:s3cret")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (app, _) = test_app();
    let (status, doc) = send(
        &app,
        "GET",
        "/openapi.json",
        Some(bearer("supervisor", SUPERVISOR)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/v1/outpasses"));
    assert!(paths.contains_key("/v1/outpasses/{id}/decision"));
    assert!(paths.contains_key("/v1/checkpoint/scans"));
    assert!(paths.contains_key("/v1/checkpoint/logs"));
}
