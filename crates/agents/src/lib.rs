//! Gateways and agents for KGraph
//!
//! This crate contains everything between the HTTP surface and the store:
//! - LLM gateways: graph extraction and graph-grounded chat
//! - Ingestion: normalizing text, URLs, and documents into clean text
//! - PathFinder: computes the explanatory subgraph behind a chat answer

pub mod error;
pub mod gateway;
pub mod ingest;
pub mod llm;
pub mod pathfinder;

pub use error::{GatewayError, Result};
pub use gateway::{ChatGateway, ExtractionGateway};
pub use llm::LlmClient;
pub use pathfinder::PathFinder;
