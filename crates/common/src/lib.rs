//! TripForge Common Library
//!
//! Shared code for the TripForge planning service including:
//! - Domain models (trip parameters, inference, precedents, prompts)
//! - Entity recognition and the known-city gazetteer
//! - Knowledge graph clients and precedent retrieval
//! - The planning pipeline (extract, infer, retrieve, assemble, generate)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod context;
pub mod entities;
pub mod errors;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod retrieval;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::TripPlanner;
pub use errors::{AppError, Result};
pub use graph::KnowledgeGraph;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
