//! Knowledge graph access
//!
//! Provides:
//! - The narrow query interface the retriever depends on
//! - Neo4j backend over the HTTP transactional endpoint
//! - In-memory backend seeded from JSON (offline development, tests)

mod memory;
mod neo4j;

pub use memory::InMemoryGraph;
pub use neo4j::Neo4jGraph;

use crate::config::{GraphBackend, GraphConfig};
use crate::errors::Result;
use crate::models::PrecedentTrip;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Filter for one bounded precedent query
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PrecedentFilter {
    /// Destination names to match, most preferred first. Empty means
    /// "match on origin only".
    pub destinations: Vec<String>,

    /// Trips leaving from here also match
    pub origin: Option<String>,

    /// Used to pick the closest candidates before `limit` applies
    pub duration_days: Option<u32>,
    pub budget: Option<f64>,

    /// Maximum rows returned
    pub limit: usize,
}

impl PrecedentFilter {
    /// True when the filter cannot match anything
    pub fn is_unbounded(&self) -> bool {
        self.destinations.is_empty() && self.origin.is_none()
    }

    /// Lower-cased destination names, as compared by every backend
    pub fn destination_keys(&self) -> Vec<String> {
        self.destinations.iter().map(|d| d.trim().to_lowercase()).collect()
    }

    pub fn origin_key(&self) -> Option<String> {
        self.origin.as_ref().map(|o| o.trim().to_lowercase())
    }
}

/// Read-only query interface over the precedent trip store
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Run one bounded query. Returns at most `filter.limit` records.
    async fn find_precedents(&self, filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn backend(&self) -> &str;
}

/// Build the configured backend
pub async fn connect(config: &GraphConfig) -> Result<Arc<dyn KnowledgeGraph>> {
    match config.backend {
        GraphBackend::Neo4j => {
            info!(uri = %config.uri, database = %config.database, "Using Neo4j knowledge graph");
            Ok(Arc::new(Neo4jGraph::new(config)?))
        }
        GraphBackend::Memory => {
            let path = config.seed_path.as_deref().unwrap_or_default();
            let graph = InMemoryGraph::from_file(path).await?;
            info!(path = %path, trips = graph.len(), "Using in-memory knowledge graph");
            Ok(Arc::new(graph))
        }
    }
}
