//! In-memory knowledge graph

use super::{KnowledgeGraph, PrecedentFilter};
use crate::errors::{AppError, Result};
use crate::models::PrecedentTrip;
use async_trait::async_trait;

/// Precedent store held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    trips: Vec<PrecedentTrip>,
}

impl InMemoryGraph {
    /// Create from records
    pub fn new(trips: Vec<PrecedentTrip>) -> Self {
        Self {
            trips: trips.into_iter().map(PrecedentTrip::normalized).collect(),
        }
    }

    /// Load a JSON array of precedent trips
    pub async fn from_file(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| AppError::Configuration {
            message: format!("Failed to read graph seed '{}': {}", path, e),
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let trips: Vec<PrecedentTrip> = serde_json::from_str(raw)?;
        Ok(Self::new(trips))
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

#[async_trait]
impl KnowledgeGraph for InMemoryGraph {
    async fn find_precedents(&self, filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>> {
        if filter.is_unbounded() || filter.limit == 0 {
            return Ok(Vec::new());
        }

        let destinations = filter.destination_keys();
        let origin = filter.origin_key();

        // Same pre-ordering as the Cypher query: the requested destination,
        // then the other destinations, then origin-only hits; within a tier
        // closest budget, then closest duration, then id.
        let mut matched: Vec<(u8, f64, u32, &PrecedentTrip)> = self
            .trips
            .iter()
            .filter_map(|trip| {
                let dest = trip.destination.to_lowercase();
                let tier = if destinations.first() == Some(&dest) {
                    0
                } else if destinations.contains(&dest) {
                    1
                } else if origin.as_deref() == Some(trip.origin.to_lowercase().as_str()) {
                    2
                } else {
                    return None;
                };
                let budget_gap = filter.budget.map_or(0.0, |b| (trip.budget - b).abs());
                let days_gap = filter.duration_days.map_or(0, |d| trip.duration_days.abs_diff(d));
                Some((tier, budget_gap, days_gap, trip))
            })
            .collect();

        matched.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
                .then(a.3.id.cmp(&b.3.id))
        });

        Ok(matched
            .into_iter()
            .take(filter.limit)
            .map(|(_, _, _, trip)| trip.clone())
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r#"[
        {"id": 1, "origin": "Sarasota", "destination": "Chicago", "duration_days": 3, "budget": 1900},
        {"id": 2, "origin": "Kansas City", "destination": "New York", "duration_days": 3, "budget": 1400},
        {"id": 3, "origin": "Boston", "destination": "new york", "duration_days": 5, "budget": 3000},
        {"id": 4, "origin": "Kansas City", "destination": "Denver", "duration_days": 2, "budget": 600}
    ]"#;

    #[tokio::test]
    async fn test_destination_match_is_case_insensitive() {
        let graph = InMemoryGraph::from_json(SEED).unwrap();
        let filter = PrecedentFilter {
            destinations: vec!["New York".to_string()],
            limit: 10,
            ..Default::default()
        };

        let trips = graph.find_precedents(&filter).await.unwrap();
        let ids: Vec<i64> = trips.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(trips[0].cost_breakdown.len(), 4);
    }

    #[tokio::test]
    async fn test_origin_matches_after_destinations() {
        let graph = InMemoryGraph::from_json(SEED).unwrap();
        let filter = PrecedentFilter {
            destinations: vec!["Chicago".to_string()],
            origin: Some("kansas city".to_string()),
            limit: 10,
            ..Default::default()
        };

        let ids: Vec<i64> = graph
            .find_precedents(&filter)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn test_limit_and_unbounded_filter() {
        let graph = InMemoryGraph::from_json(SEED).unwrap();

        let unbounded = PrecedentFilter { limit: 10, ..Default::default() };
        assert!(graph.find_precedents(&unbounded).await.unwrap().is_empty());

        let limited = PrecedentFilter {
            destinations: vec!["New York".to_string()],
            budget: Some(2900.0),
            limit: 1,
            ..Default::default()
        };
        let trips = graph.find_precedents(&limited).await.unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, 3);
    }

    #[tokio::test]
    async fn test_bundled_seed_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/precedents.json");
        let graph = InMemoryGraph::from_file(path).await.unwrap();
        assert_eq!(graph.len(), 5);
        assert!(graph.ping().await.is_ok());

        let missing = InMemoryGraph::from_file("does/not/exist.json").await;
        assert!(matches!(missing, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_requested_destination_survives_limit() {
        let mut trips: Vec<PrecedentTrip> = (1..=12)
            .map(|id| PrecedentTrip {
                id,
                origin: "Chicago".to_string(),
                destination: "Boston".to_string(),
                duration_days: 3,
                budget: 1500.0,
                people: None,
                cost_breakdown: vec![],
            })
            .collect();
        trips.push(PrecedentTrip {
            id: 100,
            origin: "Chicago".to_string(),
            destination: "New York".to_string(),
            duration_days: 3,
            budget: 5000.0,
            people: None,
            cost_breakdown: vec![],
        });
        let graph = InMemoryGraph::new(trips);

        let filter = PrecedentFilter {
            destinations: vec!["New York".to_string(), "Boston".to_string()],
            budget: Some(1500.0),
            duration_days: Some(3),
            limit: 4,
            ..Default::default()
        };
        let ids: Vec<i64> = graph
            .find_precedents(&filter)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![100, 1, 2, 3]);
    }
}
