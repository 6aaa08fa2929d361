//! LLM client for graph extraction and graph-grounded chat.
//!
//! Talks to either a HF text-generation-inference server or a local
//! Ollama instance, selected by environment. Both gateways constrain the
//! model to JSON output (via a grammar for TGI, via the chat `format`
//! field for Ollama) and validate the payload at the boundary; a payload
//! that fails to parse is an upstream error, never silently coerced.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use kgraph_core::{ChatAnswer, Graph};

use crate::{ChatGateway, ExtractionGateway, GatewayError, Result};

const DEFAULT_PROVIDER: &str = "ollama";
const DEFAULT_TGI_URL: &str = "http://localhost:8082";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "phi4-mini:latest";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const MAX_GRAPH_NODES: usize = 30;
const MAX_GRAPH_EDGES: usize = 30;
const MAX_SUGGESTED_QUERIES: usize = 3;

const SYSTEM_PROMPT: &str = "You are a strict JSON generator. Respond with \
a single JSON object matching the requested schema. No prose, no markdown.";

fn env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Clone, Copy, Debug)]
enum Provider {
    Tgi,
    Ollama,
}

/// HTTP client implementing both LLM gateways
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    provider: Provider,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    /// Client for a TGI endpoint at the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            provider: Provider::Tgi,
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Client configured from the environment:
    /// `LLM_PROVIDER` (tgi | ollama), `LLM_URL`, `LLM_MODEL`,
    /// `LLM_TIMEOUT_SECS`.
    pub fn default_local() -> Self {
        let provider = env_or_default("LLM_PROVIDER", DEFAULT_PROVIDER);
        let timeout = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        if provider.eq_ignore_ascii_case("tgi") {
            let url = env_or_default("LLM_URL", DEFAULT_TGI_URL);
            Self {
                timeout: Duration::from_secs(timeout),
                ..Self::new(url)
            }
        } else {
            Self {
                client: Client::new(),
                base_url: env_or_default("LLM_URL", DEFAULT_OLLAMA_URL),
                provider: Provider::Ollama,
                model: env_or_default("LLM_MODEL", DEFAULT_OLLAMA_MODEL),
                timeout: Duration::from_secs(timeout),
            }
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the inference service answers its health endpoint
    pub async fn health(&self) -> Result<bool> {
        let url = match self.provider {
            Provider::Tgi => format!("{}/health", self.base_url),
            Provider::Ollama => format!("{}/api/tags", self.base_url),
        };
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Run one constrained-JSON generation and return the raw payload
    async fn generate(&self, prompt: String, schema: Value) -> Result<String> {
        match self.provider {
            Provider::Tgi => self.tgi_generate(prompt, schema).await,
            Provider::Ollama => self.ollama_generate(prompt, schema).await,
        }
    }

    async fn tgi_generate(&self, prompt: String, schema: Value) -> Result<String> {
        let url = format!("{}/generate", self.base_url);
        let request = TgiGenerateRequest {
            inputs: format!("{}\n\n{}", SYSTEM_PROMPT, prompt),
            parameters: TgiParameters {
                max_new_tokens: 1024,
                return_full_text: false,
                grammar: Some(schema),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        extract_generated_text(response)
    }

    async fn ollama_generate(&self, prompt: String, schema: Value) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                OllamaChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            stream: false,
            format: Some(schema),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<OllamaChatResponse>()
            .await?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl ExtractionGateway for LlmClient {
    #[instrument(skip(self, text))]
    async fn extract_graph(&self, text: &str) -> Result<Graph> {
        debug!("Extracting graph from {} chars of text", text.len());

        let prompt = format!(
            "Extract a knowledge graph from the text below.\n\n\
             Return JSON with this shape:\n\
             {{\"nodes\":[{{\"id\":string,\"label\":string,\"properties\":object}}],\
             \"edges\":[{{\"source_id\":string,\"target_id\":string,\"relationship_type\":string}}]}}\n\n\
             Rules:\n\
             - \"id\" is a short stable identifier for the entity (e.g. \"alice\", \"acme_corp\")\n\
             - every edge references ids from \"nodes\"\n\
             - \"properties\" holds scalar attributes only; use {{}} when there are none\n\
             - at most {max_nodes} nodes and {max_edges} edges\n\n\
             Text:\n{text}",
            max_nodes = MAX_GRAPH_NODES,
            max_edges = MAX_GRAPH_EDGES,
        );

        let payload = self.generate(prompt, graph_schema()).await?;
        parse_graph_payload(&payload)
    }
}

#[async_trait]
impl ChatGateway for LlmClient {
    #[instrument(skip(self, graph_summary))]
    async fn chat_with_graph(&self, question: &str, graph_summary: &str) -> Result<ChatAnswer> {
        let prompt = format!(
            "Answer the question using ONLY the knowledge graph summary below.\n\n\
             Return JSON: {{\"answer\":string,\"confidence\":\"HIGH\"|\"MEDIUM\"|\"LOW\",\
             \"relevant_node_ids\":[string],\"suggested_queries\":[string]}}\n\n\
             Rules:\n\
             - confidence is HIGH when the graph states the answer, MEDIUM when it is \
             partially supported, LOW when the graph does not contain it\n\
             - relevant_node_ids lists the node IDs that support the answer\n\
             - suggest at most {max_queries} follow-up queries\n\n\
             {graph_summary}\n\n\
             Question: {question}",
            max_queries = MAX_SUGGESTED_QUERIES,
        );

        let payload = self.generate(prompt, chat_schema()).await?;
        parse_chat_payload(&payload)
    }
}

// ==========================================
// REQUEST/RESPONSE TYPES
// ==========================================

#[derive(Serialize)]
struct TgiGenerateRequest {
    inputs: String,
    parameters: TgiParameters,
}

#[derive(Serialize)]
struct TgiParameters {
    max_new_tokens: u32,
    return_full_text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    grammar: Option<Value>,
}

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
}

#[derive(Serialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatMessageBody,
}

#[derive(Deserialize)]
struct OllamaChatMessageBody {
    content: String,
}

// ==========================================
// SCHEMAS & PARSING
// ==========================================

fn graph_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["nodes", "edges"],
        "properties": {
            "nodes": {
                "type": "array",
                "maxItems": MAX_GRAPH_NODES,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["id", "label"],
                    "properties": {
                        "id": { "type": "string" },
                        "label": { "type": "string" },
                        "properties": { "type": "object" }
                    }
                }
            },
            "edges": {
                "type": "array",
                "maxItems": MAX_GRAPH_EDGES,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["source_id", "target_id", "relationship_type"],
                    "properties": {
                        "source_id": { "type": "string" },
                        "target_id": { "type": "string" },
                        "relationship_type": { "type": "string" }
                    }
                }
            }
        }
    })
}

fn chat_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["answer", "confidence"],
        "properties": {
            "answer": { "type": "string" },
            "confidence": { "enum": ["HIGH", "MEDIUM", "LOW"] },
            "relevant_node_ids": {
                "type": "array",
                "items": { "type": "string" }
            },
            "suggested_queries": {
                "type": "array",
                "maxItems": MAX_SUGGESTED_QUERIES,
                "items": { "type": "string" }
            }
        }
    })
}

/// Strip markdown fences and surrounding prose from a model payload,
/// keeping the outermost JSON object.
fn normalize_json_payload(payload: &str) -> &str {
    let mut text = payload.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.trim_start_matches("json").trim_start();
        text = inner.strip_suffix("```").map(str::trim).unwrap_or(inner);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn parse_graph_payload(payload: &str) -> Result<Graph> {
    let cleaned = normalize_json_payload(payload);
    let graph: Graph = serde_json::from_str(cleaned).map_err(|e| {
        GatewayError::Processing(format!("extraction returned invalid JSON: {e}"))
    })?;
    graph
        .validate()
        .map_err(|e| GatewayError::Processing(format!("extracted graph rejected: {e}")))
}

fn parse_chat_payload(payload: &str) -> Result<ChatAnswer> {
    let cleaned = normalize_json_payload(payload);
    serde_json::from_str(cleaned)
        .map_err(|e| GatewayError::Processing(format!("chat returned invalid JSON: {e}")))
}

fn extract_generated_text(value: Value) -> Result<String> {
    // TGI responds with {"generated_text": ...} or a one-element array of it
    match value {
        Value::Array(mut items) => match items.pop() {
            Some(item) => extract_generated_text(item),
            None => Err(GatewayError::Processing(
                "empty TGI response array".to_string(),
            )),
        },
        Value::Object(mut obj) => match obj.remove("generated_text") {
            Some(Value::String(text)) => Ok(text),
            _ => Err(GatewayError::Processing(
                "TGI response missing generated_text".to_string(),
            )),
        },
        other => Err(GatewayError::Processing(format!(
            "unexpected TGI response format: {other}"
        ))),
    }
}
