//! Precedent ranking
//!
//! Candidates are grouped into match tiers, then ordered inside a tier by
//! how close their budget and duration are to the query.

use crate::models::{PrecedentTrip, TripParameters};
use serde::Serialize;

/// How a precedent matched the query. Earlier variants rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Same origin and destination
    ExactRoute,
    /// Same destination
    ExactDestination,
    /// Destination is a nearby known city
    NearbyDestination,
    /// Only the origin matches
    SameOrigin,
}

/// A candidate with its ranking keys
#[derive(Debug, Clone)]
pub struct RankedPrecedent {
    pub trip: PrecedentTrip,
    pub tier: MatchTier,
    pub distance: f64,
}

/// Rank candidates. Candidates matching no tier are dropped.
pub fn rank(candidates: Vec<PrecedentTrip>, params: &TripParameters, nearby: &[String]) -> Vec<RankedPrecedent> {
    let mut ranked: Vec<RankedPrecedent> = candidates
        .into_iter()
        .filter_map(|trip| {
            let tier = match_tier(&trip, params, nearby)?;
            let distance = distance(&trip, params);
            Some(RankedPrecedent { trip, tier, distance })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then(a.distance.total_cmp(&b.distance))
            .then(a.trip.id.cmp(&b.trip.id))
    });
    ranked
}

fn match_tier(trip: &PrecedentTrip, params: &TripParameters, nearby: &[String]) -> Option<MatchTier> {
    let same_origin = same_place(params.origin.as_deref(), &trip.origin);
    let same_destination = same_place(params.destination.as_deref(), &trip.destination);

    if same_destination && same_origin {
        Some(MatchTier::ExactRoute)
    } else if same_destination {
        Some(MatchTier::ExactDestination)
    } else if nearby.iter().any(|n| n.eq_ignore_ascii_case(trip.destination.trim())) {
        Some(MatchTier::NearbyDestination)
    } else if same_origin {
        Some(MatchTier::SameOrigin)
    } else {
        None
    }
}

fn same_place(query: Option<&str>, record: &str) -> bool {
    query.is_some_and(|q| q.trim().eq_ignore_ascii_case(record.trim()))
}

/// Normalized distance: `|Δbudget| / max(budget, 1) + |Δdays| / max(days, 1)`.
/// A term is zero when the query leaves that field absent.
pub fn distance(trip: &PrecedentTrip, params: &TripParameters) -> f64 {
    let budget_term = params
        .budget
        .map_or(0.0, |b| (trip.budget - b).abs() / b.max(1.0));
    let days_term = params.duration_days.map_or(0.0, |d| {
        f64::from(trip.duration_days.abs_diff(d)) / f64::from(d.max(1))
    });
    budget_term + days_term
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: i64, origin: &str, destination: &str, days: u32, budget: f64) -> PrecedentTrip {
        PrecedentTrip {
            id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            duration_days: days,
            budget,
            people: None,
            cost_breakdown: vec![],
        }
        .normalized()
    }

    fn query(origin: Option<&str>, destination: Option<&str>, days: Option<u32>, budget: Option<f64>) -> TripParameters {
        TripParameters::new(
            origin.map(str::to_string),
            destination.map(str::to_string),
            days,
            budget,
            vec![],
        )
    }

    #[test]
    fn test_tiers_outrank_distance() {
        let candidates = vec![
            trip(1, "Denver", "Boston", 3, 1500.0),
            trip(2, "Chicago", "New York", 9, 9000.0),
            trip(3, "Kansas City", "new york", 12, 200.0),
            trip(4, "Kansas City", "Omaha", 3, 1500.0),
        ];
        let params = query(Some("Kansas City"), Some("New York"), Some(3), Some(1500.0));
        let nearby = vec!["Boston".to_string()];

        let ranked = rank(candidates, &params, &nearby);
        let ids: Vec<i64> = ranked.iter().map(|r| r.trip.id).collect();
        let tiers: Vec<MatchTier> = ranked.iter().map(|r| r.tier).collect();

        assert_eq!(ids, vec![3, 2, 1, 4]);
        assert_eq!(
            tiers,
            vec![
                MatchTier::ExactRoute,
                MatchTier::ExactDestination,
                MatchTier::NearbyDestination,
                MatchTier::SameOrigin,
            ]
        );
    }

    #[test]
    fn test_ties_break_on_id() {
        let candidates = vec![
            trip(9, "A", "Paris", 3, 900.0),
            trip(2, "B", "Paris", 3, 900.0),
        ];
        let ranked = rank(candidates, &query(None, Some("Paris"), Some(3), Some(900.0)), &[]);
        let ids: Vec<i64> = ranked.iter().map(|r| r.trip.id).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn test_unmatched_candidates_dropped() {
        let ranked = rank(vec![trip(1, "Rome", "Oslo", 3, 100.0)], &query(None, Some("Paris"), None, None), &[]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_distance_normalized() {
        let record = trip(1, "A", "B", 6, 1500.0);
        assert_eq!(distance(&record, &query(None, None, None, None)), 0.0);
        assert_eq!(distance(&record, &query(None, None, Some(3), Some(1000.0))), 1.5);
    }
}
