//! HTTP surface for KGraph
//!
//! Thin axum layer wiring ingestion, the LLM gateways, the graph store
//! and the path-finder together.

pub mod api;
pub mod error;
pub mod state;

pub use api::router;
pub use error::ApiError;
pub use state::{AppState, SessionContext};
