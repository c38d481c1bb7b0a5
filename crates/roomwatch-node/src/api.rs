//! HTTP API for Roomwatch.
//!
//! Device endpoints map [`IngestError`] classes onto status codes:
//! conflicts are 409, unknown tokens 401, store faults 503 (retry).

use crate::error::Error;
use crate::node::NodeState;
use crate::summary;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use roomwatch_core::{
    Action, CardId, ErrorClass, IngestError, RoomId, RoomSummary, StateReport,
    StateReportReceipt, TimeInterval, TransitionReceipt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<NodeState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for dashboard access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Device ingestion
        .route("/api/v1/device/transition", post(submit_transition))
        .route("/api/v1/device/state", post(submit_state_report))
        // Room summaries
        .route("/api/v1/rooms/summary", get(list_summaries))
        .route("/api/v1/rooms/:id/summary", get(get_summary))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Errors ---

/// Error body returned to devices and dashboards.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Failure of an API call.
#[derive(Debug)]
pub enum ApiError {
    Ingest(IngestError),
    Malformed(String),
    NotFound(String),
    Internal(String),
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::Ingest(e)
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::NotFound(what) => ApiError::NotFound(what),
            Error::InvalidInput(msg) => ApiError::Malformed(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Ingest(e) => {
                let status = match e.class() {
                    ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
                    ErrorClass::Conflict => StatusCode::CONFLICT,
                    ErrorClass::Transient => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, e.code().to_string(), e.to_string())
            }
            ApiError::Malformed(msg) => (StatusCode::BAD_REQUEST, "MALFORMED".into(), msg),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND".into(),
                format!("{} not found", what),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal API error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL".into(),
                    "internal error".into(),
                )
            }
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

/// Run a blocking storage call off the async runtime.
async fn blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    ApiError: From<E>,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => Err(ApiError::Ingest(IngestError::StoreFault(e.to_string()))),
    }
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Device endpoints ---

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    token: String,
    card_id: String,
    action: Action,
    timestamp: Option<DateTime<Utc>>,
}

async fn submit_transition(
    State(state): State<AppState>,
    Json(req): Json<TransitionRequest>,
) -> Result<(StatusCode, Json<TransitionReceipt>), ApiError> {
    let TransitionRequest {
        token,
        card_id,
        action,
        timestamp,
    } = req;

    state
        .config
        .token_policy
        .check(&token)
        .map_err(|e| ApiError::Malformed(e.to_string()))?;
    let card = CardId::new(card_id).map_err(|e| ApiError::Malformed(e.to_string()))?;

    let engine = state.engine.clone();
    let receipt =
        blocking(move || engine.submit_transition(&token, &card, action, timestamp)).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
struct StateReportRequest {
    token: String,
    #[serde(flatten)]
    report: StateReport,
}

async fn submit_state_report(
    State(state): State<AppState>,
    Json(req): Json<StateReportRequest>,
) -> Result<(StatusCode, Json<StateReportReceipt>), ApiError> {
    let StateReportRequest { token, report } = req;

    state
        .config
        .token_policy
        .check(&token)
        .map_err(|e| ApiError::Malformed(e.to_string()))?;

    let engine = state.engine.clone();
    let receipt = blocking(move || engine.submit_state_report(&token, &report)).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

// --- Summary endpoints ---

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

async fn list_summaries(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    let storage = Arc::clone(&state.storage);
    let summaries = blocking(move || summary::all_summaries(&storage)).await?;
    Ok(Json(summaries))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<RoomId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<RoomSummary>, ApiError> {
    // Averages need both ends of the interval
    let interval = match (query.from, query.to) {
        (Some(from), Some(to)) => Some(TimeInterval::new(from, to)),
        _ => None,
    };

    let storage = Arc::clone(&state.storage);
    let summary = blocking(move || summary::room_summary(&storage, id, interval.as_ref())).await?;
    Ok(Json(summary))
}
