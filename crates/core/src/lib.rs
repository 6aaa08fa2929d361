//! Core domain types for KGraph
//!
//! This crate defines the fundamental data structures used throughout
//! the application: graphs extracted from text, chat answers, and the
//! explanatory paths that ground them.

pub mod chat;
pub mod error;
pub mod graph;
pub mod path;
pub mod relation;

pub use chat::{ChatAnswer, Confidence};
pub use error::{CoreError, Result};
pub use graph::{Edge, Graph, Node};
pub use path::Path;
pub use relation::{is_sanitized, sanitize_relationship_type, DEFAULT_RELATIONSHIP_TYPE};
