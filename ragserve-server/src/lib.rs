//! HTTP surface for the ragserve pipeline.
//!
//! A small JSON API over [`ragserve_core::RagPipeline`]: one query
//! endpoint plus corpus management. Caller mistakes map to 4xx, remote
//! service failures to 502, everything else to 500; error bodies carry a
//! plain-language message and never leak credentials or internals.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use ragserve_core::{Document, RagError, RagPipeline, Reference};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

/// Listen address configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

/// Build the application router.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/documents", post(ingest_document).get(list_documents).delete(clear_corpus))
        .route("/api/documents/{id}", get(get_document).delete(remove_document))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn run_server(state: AppState, config: ServerConfig) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for ragserve server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ragserve listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer: String,
    pub references: Vec<ReferenceBody>,
    pub mode: ragserve_core::AnswerMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceBody {
    pub chunk_id: String,
    pub score: f32,
}

impl From<Reference> for ReferenceBody {
    fn from(r: Reference) -> Self {
        Self { chunk_id: r.chunk_id, score: r.score }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub id: String,
    pub chunk_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub text_len: usize,
}

/// Map a pipeline error to an HTTP response.
///
/// The `Display` text of [`RagError`] is written for end users, so it is
/// safe to return verbatim.
fn error_response(e: &RagError) -> Response {
    let status = match e {
        RagError::InvalidParameter(_)
        | RagError::EmptyCorpus
        | RagError::NoRelevantContent
        | RagError::ConfigError(_) => StatusCode::BAD_REQUEST,
        RagError::EmbeddingUnavailable { .. } | RagError::GenerationUnavailable { .. } => {
            StatusCode::BAD_GATEWAY
        }
        RagError::PipelineError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "request failed");
    }
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

// ── Handlers ───────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "ragserve"}))
}

async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Response {
    match state.pipeline.answer(&req.query, req.top_k).await {
        Ok(answer) => Json(QueryResponse {
            answer: answer.text,
            references: answer.references.into_iter().map(ReferenceBody::from).collect(),
            mode: answer.mode,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn ingest_document(State(state): State<AppState>, Json(req): Json<IngestRequest>) -> Response {
    let id = req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let document = Document { id: id.clone(), title: req.title, text: req.text };

    match state.pipeline.ingest(document).await {
        Ok(chunk_count) => {
            (StatusCode::CREATED, Json(IngestResponse { id, chunk_count })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn list_documents(State(state): State<AppState>) -> impl IntoResponse {
    let documents: Vec<DocumentSummary> = state
        .pipeline
        .corpus()
        .list_documents()
        .await
        .into_iter()
        .map(|d| DocumentSummary { id: d.id, title: d.title, text_len: d.text.len() })
        .collect();
    Json(json!({ "documents": documents }))
}

async fn get_document(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Response {
    match state.pipeline.corpus().get_document(&id).await {
        Some(d) => Json(DocumentSummary { id: d.id, title: d.title, text_len: d.text.len() })
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no document with id '{id}'") })),
        )
            .into_response(),
    }
}

async fn remove_document(
    State(state): State<AppState>,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Response {
    if state.pipeline.corpus().remove_document(&id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no document with id '{id}'") })),
        )
            .into_response()
    }
}

async fn clear_corpus(State(state): State<AppState>) -> impl IntoResponse {
    state.pipeline.corpus().clear().await;
    info!("corpus cleared");
    StatusCode::NO_CONTENT
}
