//! Chat answer types returned by the LLM gateway

use serde::{Deserialize, Serialize};

/// How confident the model is that the answer is grounded in the graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    /// Answer found directly in the graph
    #[serde(alias = "high")]
    High,
    /// Answer partially supported by the graph
    #[serde(alias = "medium")]
    Medium,
    /// Answer not supported by the graph
    #[serde(alias = "low")]
    Low,
}

impl Default for Confidence {
    fn default() -> Self {
        Self::Low
    }
}

/// A structured answer from the chat gateway, validated at the boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    /// Natural-language answer text
    pub answer: String,

    /// Confidence label attached by the model
    #[serde(default)]
    pub confidence: Confidence,

    /// Ids of nodes the model claims are pertinent to the answer; may
    /// contain ids unknown to the current graph
    #[serde(default)]
    pub relevant_node_ids: Vec<String>,

    /// Follow-up questions the model suggests
    #[serde(default)]
    pub suggested_queries: Vec<String>,
}
