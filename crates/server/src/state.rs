//! Shared application state

use std::sync::Arc;

use tokio::sync::RwLock;

use kgraph_agents::{ChatGateway, ExtractionGateway};
use kgraph_core::Graph;
use kgraph_db::SurrealGraphStore;

/// Single-slot holder of the most recently produced graph (extracted or
/// read back from the store). Last writer wins; handlers snapshot it
/// once at request start so each request sees a consistent graph.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Graph>>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current graph
    pub async fn replace(&self, graph: Graph) {
        *self.inner.write().await = Some(graph);
    }

    /// Clone of the current graph, if any
    pub async fn snapshot(&self) -> Option<Graph> {
        self.inner.read().await.clone()
    }
}

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SurrealGraphStore,
    pub extraction: Arc<dyn ExtractionGateway>,
    pub chat: Arc<dyn ChatGateway>,
    pub context: SessionContext,
}
