//! HTTP server for the browser front end.
//!
//! One [`Assistant`] lives behind a mutex, so events from every client are
//! handled one at a time against the same session. The scholarly search
//! proxy and the health check do not touch the session and run without
//! the lock.
//!
//! Browsers send PDFs as `multipart/form-data` to `/api/upload`; the
//! server never opens paths named by a client.

use crate::assistant::{Assistant, Event};
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::guide::GuideTemplate;
use crate::history::{HistoryEntry, HistoryError};
use crate::model::{ApiError, HealthResponse, Render, Reply, MAX_DOCUMENTS};
use crate::pdf::Upload;
use crate::scholar::ScholarClient;
use crate::transcript::TranscriptError;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

/// Upper bound for one upload request (all files together)
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub assistant: Mutex<Assistant>,
    pub completion: CompletionClient,
    pub scholar: ScholarClient,
    pub config: Config,
}

impl AppState {
    pub fn new(assistant: Assistant, config: Config) -> Self {
        Self {
            completion: assistant.completion().clone(),
            scholar: assistant.scholar().clone(),
            assistant: Mutex::new(assistant),
            config,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/scholar", get(scholar_search))
        .route("/api/events", post(handle_event))
        .route(
            "/api/upload",
            post(upload_documents).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/history", get(list_history))
        .route("/api/guides", get(list_guides))
        .route("/api/transcript", get(download_transcript))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        completion_configured: state.completion.is_configured(),
        scholar_configured: state.scholar.is_configured(),
    })
}

#[derive(Debug, Deserialize)]
struct ScholarQuery {
    q: Option<String>,
}

/// Markdown list of articles for `q`
#[instrument(skip(state))]
async fn scholar_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScholarQuery>,
) -> Result<Response, AppError> {
    let topic = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::InvalidRequest("Falta el parámetro q".to_string()))?;

    match state.scholar.recommend(&topic).await {
        Reply::Answer(markdown) => Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            markdown,
        )
            .into_response()),
        Reply::Failure(message) => Err(AppError::Upstream(message)),
    }
}

async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<Event>,
) -> Result<Json<Vec<Render>>, AppError> {
    if matches!(event, Event::LoadDocuments { .. }) {
        return Err(AppError::InvalidRequest(
            "Sube los PDF a /api/upload".to_string(),
        ));
    }

    let mut renders = Vec::new();
    state.assistant.lock().await.handle(event, &mut renders).await;
    Ok(Json(renders))
}

/// Read every file part; non-PDF parts are dropped later by MIME type
#[instrument(skip_all)]
async fn upload_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Render>>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        files.push(Upload {
            name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    info!(received = files.len(), max = MAX_DOCUMENTS, "Upload received");

    let mut renders = Vec::new();
    state
        .assistant
        .lock()
        .await
        .handle(Event::UploadDocuments { files }, &mut renders)
        .await;
    Ok(Json(renders))
}

async fn list_history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let assistant = state.assistant.lock().await;
    match assistant.history() {
        Some(store) => Ok(Json(store.load().await?)),
        None => Ok(Json(Vec::new())),
    }
}

async fn list_guides(State(state): State<Arc<AppState>>) -> Json<Vec<GuideTemplate>> {
    Json(state.assistant.lock().await.guides().to_vec())
}

async fn download_transcript(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let bytes = state.assistant.lock().await.transcript_pdf()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"chat_con_asistente.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Upstream(String),
    InternalError(String),
}

impl From<HistoryError> for AppError {
    fn from(e: HistoryError) -> Self {
        AppError::InternalError(e.to_string())
    }
}

impl From<TranscriptError> for AppError {
    fn from(e: TranscriptError) -> Self {
        AppError::InternalError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::invalid_request(msg)),
            AppError::Upstream(msg) => {
                warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, ApiError::new(msg, "upstream_error"))
            }
            AppError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

/// Start the HTTP server
pub async fn start_server(state: Arc<AppState>) -> Result<(), std::io::Error> {
    let addr = state.config.server_addr();
    let router = create_router(state);

    info!("Starting Aula server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
