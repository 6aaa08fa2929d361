//! Graph store adapter
//!
//! Persists extracted graphs into SurrealDB and answers the read and
//! traversal queries the path-finder needs. Nodes live in the `entity`
//! table keyed by their extraction id; each sanitized relationship type
//! gets its own edge table, tracked in the `relation_type` registry so
//! read-back can enumerate them.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use surrealdb::RecordId;
use tracing::{debug, instrument};

use kgraph_core::{is_sanitized, sanitize_relationship_type, Edge, Graph, Node};

use crate::{DbConnection, Result, StoreError};

/// An ordered path through the graph, as returned by traversal queries.
/// `relationship_types[i]` connects `node_ids[i]` and `node_ids[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalPath {
    pub node_ids: Vec<String>,
    pub relationship_types: Vec<String>,
}

/// Query surface the path-finder and HTTP handlers depend on.
///
/// Traversal is undirected: relationship direction is ignored for
/// connectivity, only reported in the resulting path.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Idempotently merge a graph into the store. Nodes merge by id with
    /// last-write-wins properties; edges merge on (source, target,
    /// sanitized type). An edge referencing a missing node is skipped,
    /// not an error.
    async fn upsert_graph(&self, graph: &Graph) -> Result<()>;

    /// Read back every node and edge currently persisted.
    async fn fetch_graph(&self) -> Result<Graph>;

    /// Liveness probe: whether the store currently answers a trivial query.
    async fn is_reachable(&self) -> bool;

    /// Fewest-hop undirected path between two nodes, up to `max_hops`
    /// hops. `Ok(None)` when no path exists within the bound.
    async fn shortest_path(
        &self,
        start_id: &str,
        end_id: &str,
        max_hops: usize,
    ) -> Result<Option<TraversalPath>>;

    /// Which of `candidate_ids` are reachable from `start_id` within
    /// `max_hops` undirected hops, plus `start_id` itself (always first).
    async fn neighbors_within_hops(
        &self,
        start_id: &str,
        candidate_ids: &[String],
        max_hops: usize,
    ) -> Result<Vec<String>>;
}

/// SurrealDB-backed implementation of [`GraphStore`]
#[derive(Clone)]
pub struct SurrealGraphStore {
    db: DbConnection,
}

#[derive(Debug, Deserialize)]
struct EntityRow {
    id: RecordId,
    #[serde(default)]
    label: String,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    #[serde(rename = "in")]
    source: RecordId,
    #[serde(rename = "out")]
    target: RecordId,
}

/// Extract the plain string key from a record id. SurrealDB renders
/// complex keys wrapped in angle brackets; strip them so ids round-trip.
fn record_key(id: &RecordId) -> String {
    id.key()
        .to_string()
        .trim_start_matches('⟨')
        .trim_end_matches('⟩')
        .to_string()
}

impl SurrealGraphStore {
    /// Create a new store over an initialized connection
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, node))]
    async fn upsert_node(&self, node: &Node) -> Result<()> {
        let mut data = Map::new();
        data.insert("label".to_string(), Value::String(node.label.clone()));
        for (key, value) in &node.properties {
            // `id` and `label` are reserved on the record itself
            if key == "id" || key == "label" {
                continue;
            }
            data.insert(key.clone(), value.clone());
        }

        self.db
            .query("UPSERT type::thing('entity', $id) MERGE $data")
            .bind(("id", node.id.clone()))
            .bind(("data", data))
            .await?;

        Ok(())
    }

    #[instrument(skip(self, edge))]
    async fn upsert_edge(&self, edge: &Edge) -> Result<()> {
        let rel = sanitize_relationship_type(&edge.relationship_type);
        if !is_sanitized(&rel) {
            // the sanitizer guarantees this; refuse to build a query otherwise
            return Err(StoreError::InvalidRelationshipType(rel));
        }

        // Both endpoints must already exist; a dangling edge is skipped.
        if !self.node_exists(&edge.source_id).await? || !self.node_exists(&edge.target_id).await? {
            debug!(
                source = %edge.source_id,
                target = %edge.target_id,
                "skipping edge with missing endpoint"
            );
            return Ok(());
        }

        self.register_relation_type(&rel).await?;

        let source = RecordId::from(("entity", edge.source_id.as_str()));
        let target = RecordId::from(("entity", edge.target_id.as_str()));

        // Merge on identity: one edge per (source, target, type).
        let existing: Vec<RecordId> = self
            .db
            .query(format!(
                "SELECT VALUE id FROM {rel} WHERE in = $source AND out = $target"
            ))
            .bind(("source", source.clone()))
            .bind(("target", target.clone()))
            .await?
            .take(0)?;

        if !existing.is_empty() {
            return Ok(());
        }

        self.db
            .query(format!(
                "RELATE $source->{rel}->$target SET created_at = time::now()"
            ))
            .bind(("source", source))
            .bind(("target", target))
            .await?;

        Ok(())
    }

    async fn node_exists(&self, id: &str) -> Result<bool> {
        let row: Option<EntityRow> = self.db.select(("entity", id)).await?;
        Ok(row.is_some())
    }

    async fn register_relation_type(&self, rel: &str) -> Result<()> {
        self.db
            .query("UPSERT type::thing('relation_type', $name) SET name = $name")
            .bind(("name", rel.to_string()))
            .await?;
        Ok(())
    }

    /// All registered relationship types, in name order so traversal and
    /// read-back stay deterministic for a fixed graph state.
    async fn relation_types(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .db
            .query("SELECT VALUE name FROM relation_type ORDER BY name")
            .await?
            .take(0)?;
        Ok(names)
    }

    async fn edges_of_type(&self, rel: &str) -> Result<Vec<EdgeRow>> {
        if !is_sanitized(rel) {
            return Err(StoreError::InvalidRelationshipType(rel.to_string()));
        }
        let rows: Vec<EdgeRow> = self
            .db
            .query(format!("SELECT in, out FROM {rel}"))
            .await?
            .take(0)?;
        Ok(rows)
    }

    /// Undirected adjacency over every persisted edge:
    /// node id -> [(neighbor id, relationship type)]
    async fn load_adjacency(&self) -> Result<HashMap<String, Vec<(String, String)>>> {
        let mut adjacency: HashMap<String, Vec<(String, String)>> = HashMap::new();

        for rel in self.relation_types().await? {
            for row in self.edges_of_type(&rel).await? {
                let source = record_key(&row.source);
                let target = record_key(&row.target);
                adjacency
                    .entry(source.clone())
                    .or_default()
                    .push((target.clone(), rel.clone()));
                adjacency.entry(target).or_default().push((source, rel.clone()));
            }
        }

        Ok(adjacency)
    }
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    #[instrument(skip(self, graph))]
    async fn upsert_graph(&self, graph: &Graph) -> Result<()> {
        for node in &graph.nodes {
            self.upsert_node(node).await?;
        }
        for edge in &graph.edges {
            self.upsert_edge(edge).await?;
        }
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "graph upserted"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_graph(&self) -> Result<Graph> {
        let rows: Vec<EntityRow> = self.db.select("entity").await?;

        let mut nodes: Vec<Node> = rows
            .into_iter()
            .map(|row| Node {
                id: record_key(&row.id),
                label: row.label,
                properties: row.properties,
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges = Vec::new();
        for rel in self.relation_types().await? {
            for row in self.edges_of_type(&rel).await? {
                edges.push(Edge::new(
                    record_key(&row.source),
                    record_key(&row.target),
                    rel.clone(),
                ));
            }
        }

        Ok(Graph { nodes, edges })
    }

    async fn is_reachable(&self) -> bool {
        match self.db.query("RETURN 1").await {
            Ok(mut response) => response.take::<Option<i64>>(0).is_ok(),
            Err(_) => false,
        }
    }

    #[instrument(skip(self))]
    async fn shortest_path(
        &self,
        start_id: &str,
        end_id: &str,
        max_hops: usize,
    ) -> Result<Option<TraversalPath>> {
        if start_id == end_id {
            if self.node_exists(start_id).await? {
                return Ok(Some(TraversalPath {
                    node_ids: vec![start_id.to_string()],
                    relationship_types: Vec::new(),
                }));
            }
            return Ok(None);
        }

        let adjacency = self.load_adjacency().await?;

        // BFS with parent pointers; first time we pop the target we have a
        // fewest-hop path.
        let mut parent: HashMap<String, (String, String)> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        visited.insert(start_id.to_string());
        queue.push_back((start_id.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if current == end_id {
                let mut node_ids = vec![end_id.to_string()];
                let mut relationship_types = Vec::new();
                let mut cursor = end_id.to_string();

                while cursor != start_id {
                    match parent.get(&cursor) {
                        Some((previous, rel)) => {
                            relationship_types.push(rel.clone());
                            node_ids.push(previous.clone());
                            cursor = previous.clone();
                        }
                        None => break,
                    }
                }

                node_ids.reverse();
                relationship_types.reverse();

                return Ok(Some(TraversalPath {
                    node_ids,
                    relationship_types,
                }));
            }

            if depth >= max_hops {
                continue;
            }

            if let Some(neighbors) = adjacency.get(&current) {
                for (next, rel) in neighbors {
                    if visited.insert(next.clone()) {
                        parent.insert(next.clone(), (current.clone(), rel.clone()));
                        queue.push_back((next.clone(), depth + 1));
                    }
                }
            }
        }

        Ok(None)
    }

    #[instrument(skip(self, candidate_ids))]
    async fn neighbors_within_hops(
        &self,
        start_id: &str,
        candidate_ids: &[String],
        max_hops: usize,
    ) -> Result<Vec<String>> {
        let wanted: HashSet<&str> = candidate_ids.iter().map(String::as_str).collect();
        let adjacency = self.load_adjacency().await?;

        // Anchor first, then candidates in BFS discovery order.
        let mut result = vec![start_id.to_string()];
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();

        visited.insert(start_id.to_string());
        queue.push_back((start_id.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }

            if let Some(neighbors) = adjacency.get(&current) {
                for (next, _) in neighbors {
                    if visited.insert(next.clone()) {
                        if wanted.contains(next.as_str()) {
                            result.push(next.clone());
                        }
                        queue.push_back((next.clone(), depth + 1));
                    }
                }
            }
        }

        Ok(result)
    }
}
