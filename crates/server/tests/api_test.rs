//! End-to-end tests for the HTTP surface
//!
//! The LLM gateways are stubbed; the store is a real in-memory SurrealDB,
//! so extraction, persistence, and path-finding run the full wiring.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use kgraph_agents::{ChatGateway, ExtractionGateway, GatewayError, Result as GatewayResult};
use kgraph_core::{ChatAnswer, Confidence, Edge, Graph, Node};
use kgraph_db::{init_memory, SurrealGraphStore};
use kgraph_server::{api, AppState, SessionContext};

const BOUNDARY: &str = "kgraph-test-boundary";

struct StubExtraction {
    graph: Graph,
}

#[async_trait]
impl ExtractionGateway for StubExtraction {
    async fn extract_graph(&self, _text: &str) -> GatewayResult<Graph> {
        Ok(self.graph.clone())
    }
}

struct FailingExtraction;

#[async_trait]
impl ExtractionGateway for FailingExtraction {
    async fn extract_graph(&self, _text: &str) -> GatewayResult<Graph> {
        Err(GatewayError::Processing("model unavailable".to_string()))
    }
}

struct StubChat {
    answer: ChatAnswer,
}

#[async_trait]
impl ChatGateway for StubChat {
    async fn chat_with_graph(&self, _question: &str, _summary: &str) -> GatewayResult<ChatAnswer> {
        Ok(self.answer.clone())
    }
}

/// Nodes {Alice, Bob, Acme}, edges {Alice-WORKS_AT->Acme, Bob-MANAGES->Alice}
fn team_graph() -> Graph {
    Graph {
        nodes: vec![
            Node::new("Alice", "Alice"),
            Node::new("Bob", "Bob"),
            Node::new("Acme", "Acme Corp"),
        ],
        edges: vec![
            Edge::new("Alice", "Acme", "WORKS_AT"),
            Edge::new("Bob", "Alice", "MANAGES"),
        ],
    }
}

fn answer(text: &str, confidence: Confidence, relevant: &[&str]) -> ChatAnswer {
    ChatAnswer {
        answer: text.to_string(),
        confidence,
        relevant_node_ids: relevant.iter().map(|s| s.to_string()).collect(),
        suggested_queries: vec!["Who manages Alice?".to_string()],
    }
}

async fn test_state(
    extraction: Arc<dyn ExtractionGateway>,
    chat: Arc<dyn ChatGateway>,
) -> AppState {
    let db = init_memory().await.expect("Failed to init db");
    AppState {
        store: SurrealGraphStore::new(db),
        extraction,
        chat,
        context: SessionContext::new(),
    }
}

fn multipart_text_request(text: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n--{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/extract")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn multipart_file_request(filename: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/extract")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn chat_request(question: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "question": question }).to_string(),
        ))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_extract_then_chat_yields_grounded_path() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer(
                "Alice works at Acme.",
                Confidence::High,
                &["Alice", "Acme"],
            ),
        }),
    )
    .await;
    let app = api::router(state);

    // 1. extract "Alice works at Acme. Bob manages Alice."
    let response = app
        .clone()
        .oneshot(multipart_text_request(
            "Alice works at Acme. Bob manages Alice.",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let graph = json_body(response).await;
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);

    // 2. ask where Alice works
    let response = app
        .oneshot(chat_request("Where does Alice work?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["answer"], "Alice works at Acme.");
    assert_eq!(body["confidence"], "HIGH");

    // the path connects both relevant ids through WORKS_AT
    let path = &body["path"];
    let nodes: Vec<&str> = path["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(nodes.contains(&"Alice"));
    assert!(nodes.contains(&"Acme"));
    assert_eq!(path["relationships"], serde_json::json!(["WORKS_AT"]));
}

#[tokio::test]
async fn test_chat_before_extract_is_rejected() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    let response = app.oneshot(chat_request("Anyone there?")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("no graph loaded"));
}

#[tokio::test]
async fn test_low_confidence_prepends_caution_note() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("Probably Mars.", Confidence::Low, &["Alice"]),
        }),
    )
    .await;
    let app = api::router(state);

    app.clone()
        .oneshot(multipart_text_request("Alice works at Acme."))
        .await
        .unwrap();

    let response = app
        .oneshot(chat_request("Where does Alice live?"))
        .await
        .unwrap();
    let body = json_body(response).await;

    let text = body["answer"].as_str().unwrap();
    assert!(text.starts_with("⚠️"));
    assert!(text.ends_with("Probably Mars."));
    assert_eq!(body["confidence"], "LOW");
}

#[tokio::test]
async fn test_chat_with_only_unknown_ids_has_null_path() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("No idea.", Confidence::Medium, &["Zeus", "Olympus"]),
        }),
    )
    .await;
    let app = api::router(state);

    app.clone()
        .oneshot(multipart_text_request("Alice works at Acme."))
        .await
        .unwrap();

    let response = app.oneshot(chat_request("Who rules Olympus?")).await.unwrap();
    let body = json_body(response).await;

    assert!(body["path"].is_null());
}

#[tokio::test]
async fn test_extract_without_input_is_rejected() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    let response = app.oneshot(multipart_text_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extraction_failure_is_bad_gateway() {
    let state = test_state(
        Arc::new(FailingExtraction),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    let response = app
        .oneshot(multipart_text_request("Alice works at Acme."))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_graph_endpoint_returns_persisted_graph() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    app.clone()
        .oneshot(multipart_text_request("Alice works at Acme."))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/graph")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 3);

    let types: Vec<&str> = body["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["relationship_type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"WORKS_AT"));
    assert!(types.contains(&"MANAGES"));
}

#[tokio::test]
async fn test_extract_from_uploaded_file() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    let response = app
        .oneshot(multipart_file_request(
            "team.txt",
            "Alice works at Acme. Bob manages Alice.",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["nodes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_health_reports_store_and_context() {
    let state = test_state(
        Arc::new(StubExtraction {
            graph: team_graph(),
        }),
        Arc::new(StubChat {
            answer: answer("hi", Confidence::High, &[]),
        }),
    )
    .await;
    let app = api::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store_reachable"], true);
    assert_eq!(body["graph_loaded"], false);
}
