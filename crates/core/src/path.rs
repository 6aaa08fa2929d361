//! Path results - the explanatory subgraph attached to a chat answer

use serde::{Deserialize, Serialize};

/// A connected subgraph justifying a chat answer.
///
/// Either a bare list of node ids (neighborhood or fallback tiers) or an
/// ordered path where `relationships[i]` connects `nodes[i]` and
/// `nodes[i + 1]`. Computed per answer, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Node ids involved in the answer
    pub nodes: Vec<String>,

    /// Relationship types between consecutive nodes, present only when
    /// the nodes form an ordered path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<String>>,
}

impl Path {
    /// A ranked/unordered list of node ids with no connecting edges
    pub fn nodes_only(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            relationships: None,
        }
    }

    /// An ordered path with the relationship types between hops
    pub fn with_relationships(nodes: Vec<String>, relationships: Vec<String>) -> Self {
        Self {
            nodes,
            relationships: Some(relationships),
        }
    }
}
