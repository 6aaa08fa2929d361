//! Graph types - nodes, edges, and the extracted knowledge graph

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// How many nodes/edges the textual graph summary includes before cutting off.
const SUMMARY_NODE_LIMIT: usize = 50;
const SUMMARY_EDGE_LIMIT: usize = 50;

/// An entity extracted from text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier assigned by extraction, unique within a graph
    pub id: String,

    /// Human-readable type/name
    pub label: String,

    /// Additional scalar attributes, keyed by name
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Node {
    /// Create a new node without properties
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Map::new(),
        }
    }

    /// Builder: add a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A directed relationship between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the node the edge starts from
    pub source_id: String,

    /// Id of the node the edge points to
    pub target_id: String,

    /// Free-form relationship label as produced by extraction; sanitized
    /// into an identifier before it reaches the store
    pub relationship_type: String,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
        }
    }
}

/// A knowledge graph: a directed, possibly cyclic, possibly disconnected
/// multigraph over extracted entities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a node with the given id exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Validate and normalize a graph received from an untrusted boundary.
    ///
    /// Rejects empty node ids. Duplicate ids collapse into a single node,
    /// keeping the first position and the last label/properties, matching
    /// the store's merge-by-id upsert semantics.
    pub fn validate(self) -> Result<Self> {
        let mut nodes: Vec<Node> = Vec::with_capacity(self.nodes.len());
        let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

        for node in self.nodes {
            if node.id.trim().is_empty() {
                return Err(CoreError::Validation(
                    "graph node with empty id".to_string(),
                ));
            }
            match index.get(&node.id) {
                Some(&i) => nodes[i] = node,
                None => {
                    index.insert(node.id.clone(), nodes.len());
                    nodes.push(node);
                }
            }
        }

        Ok(Self {
            nodes,
            edges: self.edges,
        })
    }

    /// Serialize the graph into the textual summary handed to the chat
    /// gateway: counts, then nodes with their properties, then edges.
    /// Bounded so huge graphs don't blow up the prompt.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Graph has {} nodes and {} edges.\n\nNodes:\n",
            self.nodes.len(),
            self.edges.len()
        );

        for node in self.nodes.iter().take(SUMMARY_NODE_LIMIT) {
            out.push_str(&format!("- {} (ID: {})\n", node.label, node.id));
            for (key, value) in &node.properties {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push_str(&format!("  {}: {}\n", key, rendered));
            }
        }

        out.push_str("\nRelationships:\n");
        for edge in self.edges.iter().take(SUMMARY_EDGE_LIMIT) {
            out.push_str(&format!(
                "- {} --[{}]--> {}\n",
                edge.source_id, edge.relationship_type, edge.target_id
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let node = Node::new("alice", "Alice").with_property("role", "engineer");

        assert_eq!(node.id, "alice");
        assert_eq!(node.label, "Alice");
        assert_eq!(node.properties["role"], "engineer");
    }

    #[test]
    fn test_contains_node() {
        let graph = Graph {
            nodes: vec![Node::new("a", "A")],
            edges: vec![],
        };

        assert!(graph.contains_node("a"));
        assert!(!graph.contains_node("b"));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let graph = Graph {
            nodes: vec![Node::new("", "Nameless")],
            edges: vec![],
        };

        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_collapses_duplicate_ids() {
        let graph = Graph {
            nodes: vec![
                Node::new("a", "First"),
                Node::new("b", "Other"),
                Node::new("a", "Second"),
            ],
            edges: vec![],
        };

        let graph = graph.validate().unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "a");
        assert_eq!(graph.nodes[0].label, "Second");
    }

    #[test]
    fn test_summary_lists_nodes_and_edges() {
        let graph = Graph {
            nodes: vec![
                Node::new("alice", "Alice").with_property("role", "engineer"),
                Node::new("acme", "Acme Corp"),
            ],
            edges: vec![Edge::new("alice", "acme", "WORKS_AT")],
        };

        let summary = graph.summary();
        assert!(summary.starts_with("Graph has 2 nodes and 1 edges."));
        assert!(summary.contains("- Alice (ID: alice)"));
        assert!(summary.contains("  role: engineer"));
        assert!(summary.contains("- alice --[WORKS_AT]--> acme"));
    }
}
