//! # HTTP Server Implementation
//!
//! REST API for FaceMatch.
//!
//! ```text
//! GET    /health                              liveness
//! GET    /metrics                             counters snapshot
//! POST   /events/:event_id/photos             ingest a batch
//! DELETE /events/:event_id/photos/:photo_id   remove a photo
//! POST   /events/:event_id/search             similarity search
//! GET    /events/:event_id/stats              photo / face counts
//! ```
//!
//! Errors are returned as `{error, code}` with 400 for bad input, 404 for
//! unknown events, 504 for searches past the configured timeout and 500 for
//! anything else.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        DefaultBodyLimit, Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use facematch_core::{Config, Error, EventId, MetricsSnapshot, PhotoId, Result};
use facematch_index::{IndexStats, IngestReport, PhotoSubmission, SearchResponse};

use crate::client::FaceMatchClient;

// ========== API Types ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub photos: Vec<PhotoSubmission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Kept as raw JSON so shape problems are reported with a precise message
    pub query_embedding: serde_json::Value,
    #[serde(default)]
    pub threshold: Option<f32>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub photo_id: PhotoId,
    pub faces_removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ========== Server State ==========

pub struct AppState {
    pub client: FaceMatchClient,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let client = FaceMatchClient::new(&config);
        Self { client, config }
    }

    /// Build state and preload the configured catalog, if any
    pub fn bootstrap(config: Config) -> Result<Self> {
        let state = Self::new(config);
        if let Some(path) = &state.config.api.catalog {
            let report = state.client.load_catalog(path)?;
            info!(
                catalog = %path.display(),
                events = report.events,
                photos = report.photos,
                faces = report.faces_indexed,
                "catalog loaded"
            );
        }
        Ok(state)
    }
}

// ========== Routes ==========

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.api.max_request_size;

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/events/:event_id/photos", post(ingest_photos))
        .route("/events/:event_id/photos/:photo_id", delete(remove_photo))
        .route("/events/:event_id/search", post(search))
        .route("/events/:event_id/stats", get(stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind the configured address and serve until ctrl-c
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", state.config.api.host, state.config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    info!(%local, events = state.client.events().len(), "FaceMatch server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.client.metrics_snapshot())
}

async fn ingest_photos(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<u64>, PathRejection>,
    payload: std::result::Result<Json<IngestRequest>, JsonRejection>,
) -> ApiResult<IngestReport> {
    let Path(event_id) = path.map_err(path_rejection_response)?;
    let Json(request) = payload.map_err(rejection_response)?;

    let client = state.client.clone();
    let ingestion =
        tokio::task::spawn_blocking(move || client.ingest(EventId(event_id), request.photos)).await;
    joined(ingestion)
}

async fn remove_photo(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(u64, u64)>, PathRejection>,
) -> ApiResult<RemoveResponse> {
    let Path((event_id, photo_id)) = path.map_err(path_rejection_response)?;

    // Waits on the event's writer lock, which an ingestion batch may hold.
    let client = state.client.clone();
    let removal = tokio::task::spawn_blocking(move || {
        client
            .remove_photo(EventId(event_id), PhotoId(photo_id))
            .map(|faces_removed| RemoveResponse {
                photo_id: PhotoId(photo_id),
                faces_removed,
            })
    })
    .await;
    joined(removal)
}

async fn search(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<u64>, PathRejection>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let Path(event_id) = path.map_err(path_rejection_response)?;
    let Json(request) = payload.map_err(rejection_response)?;

    let timeout = state.config.search.timeout;
    let outcome = Arc::new(SearchOutcome::default());
    let mut task = {
        let client = state.client.clone();
        let outcome = outcome.clone();
        tokio::task::spawn_blocking(move || {
            let result = client.run_search_request(EventId(event_id), &request);
            if outcome.finish() {
                client.record_search(&result);
            }
            result
        })
    };

    match tokio::time::timeout(timeout, &mut task).await {
        Ok(result) => joined(result),
        Err(_) if outcome.abandon() => {
            state.client.metrics().record_query_timeout();
            warn!(event_id, timeout_ms = timeout.as_millis() as u64, "search timed out");
            Err(error_response(Error::QueryTimeout {
                millis: timeout.as_millis() as u64,
            }))
        }
        // Finished right at the deadline; it already counted itself.
        Err(_) => joined(task.await),
    }
}

async fn stats(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<u64>, PathRejection>,
) -> ApiResult<IndexStats> {
    let Path(event_id) = path.map_err(path_rejection_response)?;
    state
        .client
        .stats(EventId(event_id))
        .map(Json)
        .map_err(error_response)
}

/// Decides once whether a search counts as executed or as timed out. A scan
/// that outlives its deadline keeps running on the blocking pool and must
/// not also be counted as a completed query.
#[derive(Default)]
struct SearchOutcome(AtomicU8);

impl SearchOutcome {
    const PENDING: u8 = 0;
    const FINISHED: u8 = 1;
    const ABANDONED: u8 = 2;

    /// Scan side: true if the result is still wanted
    fn finish(&self) -> bool {
        self.settle(Self::FINISHED)
    }

    /// Handler side: true if the scan had not finished yet
    fn abandon(&self) -> bool {
        self.settle(Self::ABANDONED)
    }

    fn settle(&self, to: u8) -> bool {
        self.0
            .compare_exchange(Self::PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Flatten a blocking-pool join into the handler result
fn joined<T>(result: std::result::Result<Result<T>, tokio::task::JoinError>) -> ApiResult<T> {
    result
        .map_err(|e| error_response(Error::Internal { message: e.to_string() }))?
        .map(Json)
        .map_err(error_response)
}

// ========== Error Mapping ==========

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        Error::EventNotFound { .. } => StatusCode::NOT_FOUND,
        Error::QueryTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> (StatusCode, Json<ApiError>) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(code = err.error_code(), error = %err, "request failed");
    }
    (
        status,
        Json(ApiError {
            error: err.to_string(),
            code: err.error_code().to_string(),
        }),
    )
}

/// Unparseable bodies are the caller's fault, whatever axum would pick
fn rejection_response(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    error_response(Error::validation(rejection.body_text()))
}

fn path_rejection_response(rejection: PathRejection) -> (StatusCode, Json<ApiError>) {
    error_response(Error::validation(rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Error::DimensionMismatch { expected: 128, actual: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&Error::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::EventNotFound { event_id: 1 }), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&Error::QueryTimeout { millis: 5 }), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&Error::Internal { message: "x".into() }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_search_outcome_settles_once() {
        let outcome = SearchOutcome::default();
        assert!(outcome.abandon());
        assert!(!outcome.finish());

        let outcome = SearchOutcome::default();
        assert!(outcome.finish());
        assert!(!outcome.abandon());
    }

    #[test]
    fn test_search_request_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query_embedding": []}"#).unwrap();
        assert_eq!(req.threshold, None);
        assert_eq!(req.max_results, None);
    }
}
