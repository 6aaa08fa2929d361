//! API routes and handlers

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use kgraph_agents::{ingest, PathFinder};
use kgraph_core::{Confidence, Graph, Path};
use kgraph_db::GraphStore;

use crate::error::ApiError;
use crate::state::AppState;

const LOW_CONFIDENCE_NOTE: &str = "⚠️ **Note:** This answer may be unreliable \
as the information was not found in the knowledge graph.";

/// API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/extract", post(extract))
        .route("/graph", get(get_graph))
        .route("/chat", post(chat))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "name": "KGraph",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Knowledge graph extraction and grounded chat",
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "store_reachable": state.store.is_reachable().await,
        "graph_loaded": state.context.snapshot().await.is_some(),
    }))
}

/// Extract a knowledge graph from pasted text, a URL, or uploaded files
async fn extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Graph>, ApiError> {
    let input = collect_input(multipart).await?;
    let content = resolve_content(input).await?;

    let cleaned = ingest::preprocess_text(&content);
    if cleaned.is_empty() {
        return Err(ApiError::BadRequest(
            "either text or file(s) must be provided".to_string(),
        ));
    }

    let graph = state.extraction.extract_graph(&cleaned).await?;

    // Persistence is best-effort: the extracted graph is the primary
    // value, so a store failure is logged and swallowed.
    if let Err(e) = state.store.upsert_graph(&graph).await {
        warn!(error = %e, "failed to persist extracted graph");
    }

    state.context.replace(graph.clone()).await;
    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph extracted"
    );

    Ok(Json(graph))
}

/// Read the full graph back from the store
async fn get_graph(State(state): State<AppState>) -> Result<Json<Graph>, ApiError> {
    if !state.store.is_reachable().await {
        return Err(ApiError::ServiceUnavailable(
            "cannot connect to the graph store".to_string(),
        ));
    }

    let graph = state.store.fetch_graph().await?;
    state.context.replace(graph.clone()).await;

    Ok(Json(graph))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub confidence: Confidence,
    /// Explanatory subgraph, `null` when no relevant node resolves
    pub path: Option<Path>,
    pub suggested_queries: Vec<String>,
}

/// Answer a question grounded in the current graph
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Some(graph) = state.context.snapshot().await else {
        return Err(ApiError::BadRequest(
            "no graph loaded. Please extract a graph first.".to_string(),
        ));
    };

    let summary = graph.summary();
    let answer = state
        .chat
        .chat_with_graph(&request.question, &summary)
        .await?;

    let finder = PathFinder::new(state.store.clone());
    let path = finder.find(&answer.relevant_node_ids, &graph).await;

    let text = if answer.confidence == Confidence::Low {
        format!("{LOW_CONFIDENCE_NOTE}\n\n{}", answer.answer)
    } else {
        answer.answer
    };

    info!(confidence = ?answer.confidence, has_path = path.is_some(), "chat answered");

    Ok(Json(ChatResponse {
        answer: text,
        confidence: answer.confidence,
        path,
        suggested_queries: answer.suggested_queries,
    }))
}

// ==========================================
// INPUT HANDLING
// ==========================================

struct ExtractInput {
    text: Option<String>,
    files: Vec<(String, Vec<u8>)>,
}

async fn collect_input(mut multipart: Multipart) -> Result<ExtractInput, ApiError> {
    let mut input = ExtractInput {
        text: None,
        files: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        let filename = field.file_name().map(|s| s.to_string());

        if name.as_deref() == Some("text") && filename.is_none() {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(format!("invalid text field: {e}")))?;
            input.text = Some(text);
        } else if let Some(filename) = filename {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("invalid file upload: {e}")))?;
            input.files.push((filename, bytes.to_vec()));
        }
    }

    Ok(input)
}

async fn resolve_content(input: ExtractInput) -> Result<String, ApiError> {
    if !input.files.is_empty() {
        let mut sections = Vec::new();
        for (name, bytes) in &input.files {
            match ingest::extract_text_from_file(bytes, name) {
                Ok(text) if !text.trim().is_empty() => {
                    sections.push(format!("--- Content from {name} ---\n{text}"));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %name, error = %e, "failed to extract text from upload");
                }
            }
        }

        if sections.is_empty() {
            return Err(ApiError::BadRequest(
                "failed to extract text from any uploaded files".to_string(),
            ));
        }
        return Ok(sections.join("\n\n"));
    }

    match input.text {
        Some(text) if ingest::is_url(text.trim()) => {
            let url = text.trim().to_string();
            let html = ingest::fetch_url(&url)
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to fetch URL: {e}")))?;
            Ok(ingest::extract_text_from_html(&html))
        }
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ApiError::BadRequest(
            "either text or file(s) must be provided".to_string(),
        )),
    }
}
