//! Gateway traits for the LLM collaborators
//!
//! The HTTP surface and tests depend on these seams rather than on a
//! concrete client, so extraction and chat can be stubbed out.

use async_trait::async_trait;

use kgraph_core::{ChatAnswer, Graph};

use crate::Result;

/// Turns cleaned text into a typed knowledge graph. Failure is a hard
/// error: extraction is the primary value of the request it serves.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn extract_graph(&self, text: &str) -> Result<Graph>;
}

/// Answers a question against a serialized summary of the current graph.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat_with_graph(&self, question: &str, graph_summary: &str) -> Result<ChatAnswer>;
}
