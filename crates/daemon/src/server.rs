// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: the peer-facing log routes, `/do` and `/status`.
//!
//! Every body is an [`Envelope`]. Errors carry the status chosen by the
//! failing layer and `{ "error": message }`.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pairlog_adapters::API_KEY_HEADER;
use pairlog_core::{Envelope, ErrorKind, LogError, LogPayload};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::Instrument;

use crate::lifecycle::{DaemonLog, DaemonOrchestrator};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const DEFAULT_COMPACT_KEEP: u64 = 10_000;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<DaemonOrchestrator>,
    token: Option<Arc<str>>,
    fatal: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<DaemonOrchestrator>,
        token: Option<String>,
        fatal: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            orchestrator,
            token: token.map(Arc::from),
            fatal,
        }
    }

    fn log(&self) -> &DaemonLog {
        self.orchestrator.log()
    }
}

/// Per-request context, attached as a request extension
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub id: String,
    pub started: Instant,
}

/// Error response wrapping a [`LogError`]
pub struct ApiError(pub LogError);

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.0.message())
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(Envelope::<()>::error(message))).into_response()
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Build the router with auth and request-context middleware
pub fn router(state: AppState) -> Router {
    let log_routes = Router::new()
        .route("/prepare", get(get_prepared).post(post_prepare))
        .route("/commit", get(get_committed).post(post_commit))
        .route("/rollback", post(post_rollback))
        .route("/record/:id", get(get_record))
        .route("/compact", post(post_compact));

    Router::new()
        .nest("/log", log_routes)
        .route("/do", post(post_do))
        .route("/status", get(get_status))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}

async fn request_context(mut req: Request, next: Next) -> Response {
    let ctx = RequestContext {
        id: uuid::Uuid::new_v4().to_string(),
        started: Instant::now(),
    };
    let span = tracing::info_span!(
        "request",
        request_id = %ctx.id,
        method = %req.method(),
        path = %req.uri().path(),
    );
    req.extensions_mut().insert(ctx.clone());

    async move {
        let mut response = next.run(req).await;
        let status = response.status().as_u16();
        let elapsed_ms = ctx.started.elapsed().as_millis() as u64;
        if response.status().is_server_error() {
            tracing::warn!(status, elapsed_ms, "request failed");
        } else {
            tracing::debug!(status, elapsed_ms, "request complete");
        }
        if let Ok(value) = HeaderValue::from_str(&ctx.id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(token) = &state.token {
        let presented = req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(token.as_ref()) {
            tracing::debug!("rejected request with invalid token");
            return error_response(StatusCode::UNAUTHORIZED, "invalid token");
        }
    }
    next.run(req).await
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "no such route")
}

fn decode_payload(body: &Bytes) -> Result<LogPayload, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(LogError::validation(format!("invalid payload: {}", e))))
}

async fn get_prepared(State(state): State<AppState>) -> ApiResult<LogPayload> {
    Ok(Json(Envelope::data(state.log().prepared().await?)))
}

async fn post_prepare(State(state): State<AppState>, body: Bytes) -> ApiResult<()> {
    let payload = decode_payload(&body)?;
    state.log().prepare(&payload).await?;
    Ok(Json(Envelope::empty()))
}

async fn get_committed(State(state): State<AppState>) -> ApiResult<LogPayload> {
    Ok(Json(Envelope::data(state.log().committed().await?)))
}

async fn post_commit(State(state): State<AppState>) -> ApiResult<()> {
    state.log().commit().await?;
    Ok(Json(Envelope::empty()))
}

async fn post_rollback(State(state): State<AppState>) -> ApiResult<()> {
    state.log().rollback().await?;
    Ok(Json(Envelope::empty()))
}

async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<LogPayload> {
    let n: u64 = id
        .parse()
        .map_err(|_| ApiError(LogError::validation(format!("invalid record id {:?}", id))))?;
    Ok(Json(Envelope::data(state.log().record(n).await?)))
}

#[derive(Debug, Deserialize)]
struct CompactParams {
    keep: Option<u64>,
}

async fn post_compact(
    State(state): State<AppState>,
    Query(params): Query<CompactParams>,
) -> ApiResult<()> {
    let keep = params.keep.unwrap_or(DEFAULT_COMPACT_KEEP);
    let removed = state.log().compact(keep).await?;
    tracing::info!(keep, removed, "compacted commit log");
    Ok(Json(Envelope::empty()))
}

#[derive(Debug, Deserialize)]
struct DoParams {
    #[serde(rename = "ignore-version")]
    ignore_version: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoResult {
    pub version: u64,
}

async fn post_do(
    State(state): State<AppState>,
    Query(params): Query<DoParams>,
    body: Bytes,
) -> ApiResult<DoResult> {
    let payload = decode_payload(&body)?;
    let ignore_version = params.ignore_version.unwrap_or(true);
    match state.orchestrator.execute(payload, ignore_version).await {
        Ok(version) => Ok(Json(Envelope::data(DoResult { version }))),
        Err(e) => {
            if e.kind() == ErrorKind::Fatal {
                tracing::error!(error = %e, "fatal write failure, shutting down");
                state.fatal.send_replace(true);
            }
            Err(e.into())
        }
    }
}

/// Replica status reported by `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub committed: u64,
    pub prepared: Option<u64>,
    pub peer_configured: bool,
    pub peer_in_sync: bool,
    pub poisoned: bool,
    pub current_version: u64,
    pub flushed_version: u64,
    pub snapshot_version: u64,
}

async fn get_status(State(state): State<AppState>) -> ApiResult<StatusReport> {
    let orch = &state.orchestrator;
    let overlay = orch.log().service();
    Ok(Json(Envelope::data(StatusReport {
        committed: orch.log().committed_version().await?,
        prepared: orch.log().prepared_version().await?,
        peer_configured: orch.has_peer(),
        peer_in_sync: orch.peer_in_sync(),
        poisoned: orch.is_poisoned(),
        current_version: overlay.current_version(),
        flushed_version: overlay.flushed_version(),
        snapshot_version: overlay.snapshot_version(),
    })))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
