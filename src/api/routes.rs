//! API route definitions.
//!
//! Every diagnostic route takes an `api_key` query parameter checked against
//! the configured shared secret; a mismatch is rejected with 401 before the
//! core sees the request. Job outcomes map to `success` / `busy` / `error`
//! JSON bodies; internal error classification never leaks past the message.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::jobs::{JobKind, JobOutcome, JobPayload, JobRequest};

use super::state::AppState;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ping/{host}", get(ping_host))
        .route("/tcp-check/{host}/{port}", get(tcp_check))
        .route("/speedtest", get(speedtest))
        .route("/accesspoints", get(access_points))
        .route("/accesspoints/cached", get(access_points_cached))
        .with_state(state)
}

#[derive(Deserialize)]
struct AuthQuery {
    #[serde(default)]
    api_key: String,
}

type ApiResponse = (StatusCode, Json<Value>);

fn authorize(state: &AppState, auth: &AuthQuery) -> Result<(), ApiResponse> {
    if auth.api_key == state.api_key {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid API key" })),
        ))
    }
}

/// Submit a job with the overall deadline applied. A deadline hit cancels
/// the job (dropping it releases any held lock) and reports an error.
async fn dispatch(state: &AppState, request: JobRequest) -> JobOutcome {
    match tokio::time::timeout(state.job_timeout, state.dispatcher.submit(request)).await {
        Ok(outcome) => outcome,
        Err(_) => JobOutcome::Error("job deadline exceeded".into()),
    }
}

/// JSON body for a job outcome, shared with the CLI's one-shot mode.
pub fn outcome_json(outcome: &JobOutcome) -> Value {
    match outcome {
        JobOutcome::Success(payload) => payload_json(payload),
        JobOutcome::Busy => json!({ "status": "busy" }),
        JobOutcome::Error(msg) => json!({ "status": "error", "error": msg }),
    }
}

fn payload_json(payload: &JobPayload) -> Value {
    match payload {
        JobPayload::Ping(report) => json!({
            "status": "success",
            "host": report.host,
            "rtt_ms": report.rtt_ms,
        }),
        JobPayload::Tcp(report) => json!({
            "status": "success",
            "host": report.host,
            "port": report.port,
            "open": report.open,
        }),
        JobPayload::Speed(report) => {
            // Merge the derived whole-Mbps figures into the CLI's raw report,
            // same shape the original service exposed.
            let mut body = match &report.raw {
                Value::Object(map) => Value::Object(map.clone()),
                other => json!({ "raw": other }),
            };
            if let Value::Object(map) = &mut body {
                map.insert("status".into(), json!("success"));
                map.insert("download_mbps".into(), json!(report.download_mbps));
                map.insert("upload_mbps".into(), json!(report.upload_mbps));
            }
            body
        }
        JobPayload::Scan(aps) => json!({
            "status": "success",
            "access_points": aps,
        }),
    }
}

fn respond(outcome: JobOutcome, error_status: StatusCode) -> ApiResponse {
    let body = Json(outcome_json(&outcome));
    let status = match outcome {
        JobOutcome::Success(_) => StatusCode::OK,
        JobOutcome::Busy => StatusCode::SERVICE_UNAVAILABLE,
        JobOutcome::Error(_) => error_status,
    };
    (status, body)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ping_host(
    State(state): State<AppState>,
    Path(host): Path<String>,
    Query(auth): Query<AuthQuery>,
) -> ApiResponse {
    if let Err(rejection) = authorize(&state, &auth) {
        return rejection;
    }
    let outcome = dispatch(&state, JobRequest::ping(host)).await;
    respond(outcome, StatusCode::NOT_FOUND)
}

async fn tcp_check(
    State(state): State<AppState>,
    Path((host, port)): Path<(String, u16)>,
    Query(auth): Query<AuthQuery>,
) -> ApiResponse {
    if let Err(rejection) = authorize(&state, &auth) {
        return rejection;
    }
    let outcome = dispatch(&state, JobRequest::tcp_check(host, port)).await;
    respond(outcome, StatusCode::NOT_FOUND)
}

async fn speedtest(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
) -> ApiResponse {
    if let Err(rejection) = authorize(&state, &auth) {
        return rejection;
    }
    let outcome = dispatch(&state, JobRequest::speed_test(state.use_alternate_server)).await;
    respond(outcome, StatusCode::INTERNAL_SERVER_ERROR)
}

async fn access_points(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
) -> ApiResponse {
    if let Err(rejection) = authorize(&state, &auth) {
        return rejection;
    }
    let outcome = dispatch(&state, JobRequest::scan()).await;
    respond(outcome, StatusCode::INTERNAL_SERVER_ERROR)
}

/// Read-only path: serves the last consolidated scan without touching the
/// radio, with staleness exposed for the caller to judge.
async fn access_points_cached(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
) -> ApiResponse {
    if let Err(rejection) = authorize(&state, &auth) {
        return rejection;
    }
    match state.cache.get(JobKind::Scan) {
        Some(entry) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "access_points": entry.access_points,
                "stored_at": entry.stored_at.to_rfc3339(),
                "stale": entry.is_stale(),
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "error": "no cached scan available" })),
        ),
    }
}
