//! Grounded Q&A path-finder
//!
//! The chat gateway names the nodes it believes answer a question, but
//! it cannot see graph topology. This module supplies the structural
//! justification: a connected subgraph linking those nodes, found with a
//! tiered strategy (pairwise shortest paths, then neighborhood
//! expansion, then a bounded fallback). A chat answer must still render
//! when the store is down or the ids are hallucinated, so every store
//! failure degrades instead of propagating.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use kgraph_core::{Graph, Path};
use kgraph_db::{GraphStore, TraversalPath};

/// Hop bound for pairwise shortest-path queries
const PAIRWISE_MAX_HOPS: usize = 3;
/// Hop bound for the neighborhood fallback
const NEIGHBORHOOD_MAX_HOPS: usize = 2;
/// Cap on the neighborhood result size
const NEIGHBORHOOD_LIMIT: usize = 10;
/// Cap on the no-path fallback result size
const FALLBACK_LIMIT: usize = 5;

/// Computes the explanatory subgraph behind a chat answer
pub struct PathFinder<S> {
    store: S,
}

impl<S: GraphStore> PathFinder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Find a connected subgraph over the ids the chat gateway called
    /// relevant, against the given session graph context.
    ///
    /// Returns `None` only when no id resolves against the context.
    /// Never fails: store errors degrade tier by tier down to a plain
    /// list of the first few valid ids.
    #[instrument(skip(self, context))]
    pub async fn find(&self, relevant_node_ids: &[String], context: &Graph) -> Option<Path> {
        let known: HashSet<&str> = context.nodes.iter().map(|n| n.id.as_str()).collect();

        // Keep ids that exist in the context, in suggestion order,
        // first occurrence wins.
        let mut seen: HashSet<&str> = HashSet::new();
        let valid: Vec<String> = relevant_node_ids
            .iter()
            .filter(|id| known.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();

        if valid.is_empty() {
            debug!("no relevant node ids resolve against the current graph");
            return None;
        }

        // A single node has no path to draw; skip the store entirely.
        if valid.len() == 1 {
            return Some(Path::nodes_only(valid));
        }

        if !self.store.is_reachable().await {
            warn!("graph store unreachable, returning relevant nodes without a path");
            return Some(Path::nodes_only(truncated(valid, FALLBACK_LIMIT)));
        }

        if let Some(path) = self.pairwise_shortest_path(&valid).await {
            return Some(path);
        }

        if let Some(path) = self.neighborhood(&valid).await {
            return Some(path);
        }

        Some(Path::nodes_only(truncated(valid, FALLBACK_LIMIT)))
    }

    /// Tier 1: query the shortest path for every unordered pair of valid
    /// ids (O(n²) pairs, fine - n is bounded by the LLM's suggestion
    /// count, not the graph size) and keep the one explaining the most
    /// nodes. Ties go to the first path found.
    async fn pairwise_shortest_path(&self, valid: &[String]) -> Option<Path> {
        let mut best: Option<TraversalPath> = None;

        for i in 0..valid.len() {
            for j in (i + 1)..valid.len() {
                match self
                    .store
                    .shortest_path(&valid[i], &valid[j], PAIRWISE_MAX_HOPS)
                    .await
                {
                    Ok(Some(path)) => {
                        let longer = best
                            .as_ref()
                            .map_or(true, |b| path.node_ids.len() > b.node_ids.len());
                        if longer {
                            best = Some(path);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!(error = %e, start = %valid[i], end = %valid[j],
                            "shortest path query failed");
                    }
                }
            }
        }

        best.map(|path| Path::with_relationships(path.node_ids, path.relationship_types))
    }

    /// Tier 2: which of the remaining ids sit near the first one? Only
    /// meaningful when at least one candidate beyond the anchor is
    /// reachable; the store returns the anchor first, so the truncation
    /// always retains it.
    async fn neighborhood(&self, valid: &[String]) -> Option<Path> {
        let (anchor, rest) = valid.split_first()?;

        match self
            .store
            .neighbors_within_hops(anchor, rest, NEIGHBORHOOD_MAX_HOPS)
            .await
        {
            Ok(ids) if ids.len() > 1 => {
                Some(Path::nodes_only(truncated(ids, NEIGHBORHOOD_LIMIT)))
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, anchor = %anchor, "neighborhood query failed");
                None
            }
        }
    }
}

fn truncated(mut ids: Vec<String>, limit: usize) -> Vec<String> {
    ids.truncate(limit);
    ids
}
