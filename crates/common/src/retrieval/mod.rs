//! Precedent retrieval
//!
//! Provides:
//! - One bounded knowledge graph query per request
//! - Nearby-city widening through the gazetteer
//! - Tiered ranking by closeness to the query
//!
//! The graph being empty, down or slow is a normal outcome here: the
//! retriever answers with an empty list and the pipeline carries on.

mod ranking;

pub use ranking::{distance, rank, MatchTier, RankedPrecedent};

use crate::config::RetrievalConfig;
use crate::entities::gazetteer;
use crate::graph::{KnowledgeGraph, PrecedentFilter};
use crate::metrics;
use crate::models::{PrecedentTrip, TripParameters};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Nearby known cities added to a destination filter
const NEARBY_CITIES: usize = 5;

/// Retriever over a knowledge graph
pub struct Retriever {
    graph: Arc<dyn KnowledgeGraph>,
    config: RetrievalConfig,
    timeout: Duration,
}

impl Retriever {
    pub fn new(graph: Arc<dyn KnowledgeGraph>, config: RetrievalConfig, timeout: Duration) -> Self {
        Self {
            graph,
            config,
            timeout,
        }
    }

    /// Ranked precedents for `params`, at most `limit` of them
    pub async fn retrieve(&self, params: &TripParameters, limit: usize) -> Vec<PrecedentTrip> {
        let start = Instant::now();

        let Some((filter, nearby)) = self.build_filter(params, limit) else {
            debug!("No destination or origin, skipping retrieval");
            metrics::record_retrieval(start.elapsed().as_secs_f64(), "skipped", 0);
            return Vec::new();
        };

        let (outcome, trips) = match tokio::time::timeout(self.timeout, self.graph.find_precedents(&filter)).await {
            Ok(Ok(candidates)) => {
                let fetched = candidates.len();
                let trips: Vec<PrecedentTrip> = rank(candidates, params, &nearby)
                    .into_iter()
                    .take(limit)
                    .map(|r| r.trip)
                    .collect();
                debug!(
                    backend = self.graph.backend(),
                    fetched,
                    returned = trips.len(),
                    "Retrieved precedents"
                );
                (if trips.is_empty() { "empty" } else { "ok" }, trips)
            }
            Ok(Err(e)) => {
                warn!(backend = self.graph.backend(), error = %e, "Knowledge graph query failed, continuing without precedents");
                ("error", Vec::new())
            }
            Err(_) => {
                warn!(
                    backend = self.graph.backend(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Knowledge graph query timed out, continuing without precedents"
                );
                ("timeout", Vec::new())
            }
        };

        metrics::record_retrieval(start.elapsed().as_secs_f64(), outcome, trips.len());
        trips
    }

    /// Readiness check against the underlying graph
    pub async fn ping(&self) -> crate::errors::Result<()> {
        self.graph.ping().await
    }

    /// Filter for the single graph query plus the nearby names used for ranking.
    /// `None` when the query has neither destination nor origin.
    fn build_filter(&self, params: &TripParameters, limit: usize) -> Option<(PrecedentFilter, Vec<String>)> {
        if limit == 0 {
            return None;
        }

        let candidates = limit
            .saturating_mul(self.config.candidate_multiplier)
            .min(self.config.max_candidates);

        let (destinations, origin, nearby) = match (&params.destination, &params.origin) {
            (Some(destination), _) => {
                let nearby: Vec<String> = if self.config.nearby_fallback {
                    gazetteer::nearby(destination, NEARBY_CITIES)
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                } else {
                    Vec::new()
                };
                let mut destinations = vec![destination.clone()];
                destinations.extend(nearby.iter().cloned());
                (destinations, None, nearby)
            }
            (None, Some(origin)) => (Vec::new(), Some(origin.clone()), Vec::new()),
            (None, None) => return None,
        };

        let filter = PrecedentFilter {
            destinations,
            origin,
            duration_days: params.duration_days,
            budget: params.budget,
            limit: candidates,
        };
        Some((filter, nearby))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{AppError, Result};
    use crate::graph::InMemoryGraph;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn trip(id: i64, origin: &str, destination: &str, days: u32, budget: f64) -> PrecedentTrip {
        PrecedentTrip {
            id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            duration_days: days,
            budget,
            people: Some(1),
            cost_breakdown: vec![],
        }
    }

    fn retriever(graph: Arc<dyn KnowledgeGraph>) -> Retriever {
        Retriever::new(graph, RetrievalConfig::default(), Duration::from_millis(200))
    }

    fn params(origin: Option<&str>, destination: Option<&str>, days: Option<u32>, budget: Option<f64>) -> TripParameters {
        TripParameters::new(
            origin.map(str::to_string),
            destination.map(str::to_string),
            days,
            budget,
            vec![],
        )
    }

    /// Records every filter it is asked to run
    #[derive(Default)]
    struct RecordingGraph {
        filters: Mutex<Vec<PrecedentFilter>>,
    }

    #[async_trait]
    impl KnowledgeGraph for RecordingGraph {
        async fn find_precedents(&self, filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>> {
            self.filters.lock().unwrap().push(filter.clone());
            Ok(Vec::new())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn backend(&self) -> &str {
            "recording"
        }
    }

    struct FailingGraph;

    #[async_trait]
    impl KnowledgeGraph for FailingGraph {
        async fn find_precedents(&self, _filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>> {
            Err(AppError::GraphUnavailable {
                message: "connection refused".to_string(),
            })
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::GraphUnavailable {
                message: "connection refused".to_string(),
            })
        }

        fn backend(&self) -> &str {
            "failing"
        }
    }

    struct SlowGraph;

    #[async_trait]
    impl KnowledgeGraph for SlowGraph {
        async fn find_precedents(&self, _filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![trip(1, "A", "Paris", 3, 900.0)])
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn backend(&self) -> &str {
            "slow"
        }
    }

    fn new_york_graph() -> Arc<dyn KnowledgeGraph> {
        Arc::new(InMemoryGraph::new(vec![
            trip(1, "Chicago", "New York", 3, 500.0),
            trip(2, "Chicago", "New York", 3, 1000.0),
            trip(3, "Chicago", "New York", 3, 1500.0),
            trip(4, "Chicago", "New York", 3, 2000.0),
            trip(5, "Kansas City", "New York", 4, 2600.0),
            trip(6, "Denver", "Boston", 3, 1500.0),
        ]))
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let retriever = retriever(new_york_graph());
        for limit in 0..5 {
            let trips = retriever.retrieve(&params(None, Some("New York"), None, None), limit).await;
            assert!(trips.len() <= limit);
        }
        let trips = retriever.retrieve(&params(None, Some("New York"), None, None), 3).await;
        assert_eq!(trips.len(), 3);
    }

    #[tokio::test]
    async fn test_budget_proximity_ordering() {
        let retriever = retriever(new_york_graph());

        let high = retriever
            .retrieve(&params(Some("Chicago"), Some("New York"), Some(3), Some(1900.0)), 4)
            .await;
        let ids: Vec<i64> = high.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);

        let low = retriever
            .retrieve(&params(Some("Chicago"), Some("New York"), Some(3), Some(600.0)), 4)
            .await;
        let ids: Vec<i64> = low.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_exact_route_first_then_nearby() {
        let retriever = retriever(new_york_graph());
        let trips = retriever
            .retrieve(&params(Some("Kansas City"), Some("New York"), Some(3), Some(1500.0)), 10)
            .await;

        assert_eq!(trips.first().map(|t| t.id), Some(5));
        assert_eq!(trips.last().map(|t| t.destination.as_str()), Some("Boston"));
        assert_eq!(trips.len(), 6);
    }

    #[tokio::test]
    async fn test_exact_destination_outranks_closer_nearby_trips() {
        let mut trips: Vec<PrecedentTrip> = (1..=12).map(|id| trip(id, "Chicago", "Boston", 3, 1500.0)).collect();
        trips.push(trip(100, "Chicago", "New York", 3, 5000.0));
        let retriever = retriever(Arc::new(InMemoryGraph::new(trips)));

        let found = retriever
            .retrieve(&params(None, Some("New York"), Some(3), Some(1500.0)), 3)
            .await;
        let ids: Vec<i64> = found.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![100, 1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_destination_is_empty() {
        let retriever = retriever(new_york_graph());
        let trips = retriever.retrieve(&params(Some("Chicago"), Some("Atlantis"), Some(3), None), 3).await;
        assert!(trips.is_empty());
    }

    #[tokio::test]
    async fn test_origin_only_fallback() {
        let retriever = retriever(new_york_graph());
        let trips = retriever.retrieve(&params(Some("Denver"), None, None, None), 3).await;
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, 6);
    }

    #[tokio::test]
    async fn test_single_bounded_query() {
        let graph = Arc::new(RecordingGraph::default());
        let retriever = retriever(graph.clone());

        retriever.retrieve(&params(None, Some("Denver"), Some(4), Some(800.0)), 3).await;
        retriever.retrieve(&params(None, None, Some(4), Some(800.0)), 3).await;

        let filters = graph.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].limit, 12);
        assert_eq!(filters[0].destinations[0], "Denver");
        assert!(filters[0].destinations.len() > 1);
        assert_eq!(filters[0].origin, None);
    }

    #[tokio::test]
    async fn test_candidate_cap() {
        let graph = Arc::new(RecordingGraph::default());
        let config = RetrievalConfig {
            max_candidates: 10,
            nearby_fallback: false,
            ..Default::default()
        };
        let retriever = Retriever::new(graph.clone(), config, Duration::from_millis(200));

        retriever.retrieve(&params(None, Some("Denver"), None, None), 50).await;

        let filters = graph.filters.lock().unwrap();
        assert_eq!(filters[0].limit, 10);
        assert_eq!(filters[0].destinations, vec!["Denver".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_graph_degrades_to_empty() {
        let retriever = retriever(Arc::new(FailingGraph));
        let trips = retriever.retrieve(&params(None, Some("Paris"), Some(3), None), 3).await;
        assert!(trips.is_empty());
        assert!(retriever.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_slow_graph_times_out_to_empty() {
        let retriever = retriever(Arc::new(SlowGraph));
        let started = Instant::now();
        let trips = retriever.retrieve(&params(None, Some("Paris"), None, None), 3).await;

        assert!(trips.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
