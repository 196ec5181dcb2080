//! Rule Engine - Deterministic inference over trip parameters
//!
//! Every decision is an ordered table lookup. New categories or advice
//! are added by extending a table, not by adding branches.

use crate::config::RulesConfig;
use crate::entities::gazetteer::{self, Geography};
use crate::models::{BudgetTier, SymbolicInference, TripParameters, TripType};

/// Advice used when no rule fires
pub const DEFAULT_ADVICE: &str = "Insufficient information for tailored advice.";

/// Trip-type predicates over a present destination, first match wins.
/// A destination matching none of them is a city.
const TRIP_TYPE_RULES: &[(fn(&str) -> bool, TripType)] = &[
    (is_coastal_city, TripType::Beach),
    (is_mountain_city, TripType::Mountain),
    (has_beach_keyword, TripType::Beach),
    (has_mountain_keyword, TripType::Mountain),
];

/// Facts an advice rule may look at
struct Facts<'a> {
    params: &'a TripParameters,
    trip_type: TripType,
    budget_tier: BudgetTier,
}

/// Advice rules, evaluated independently and appended in this order
const ADVICE_RULES: &[(fn(&Facts) -> bool, &str)] = &[
    (
        |f| f.params.duration_days.is_some_and(|d| d <= 2),
        "Short trip: focus on 1-2 major attractions and pack light.",
    ),
    (
        |f| f.params.duration_days.is_some_and(|d| (3..=5).contains(&d)),
        "Medium trip: balance sightseeing, food and leisure time.",
    ),
    (
        |f| f.params.duration_days.is_some_and(|d| d >= 6),
        "Long trip: plan themed days or split the stay across multiple cities.",
    ),
    (
        |f| f.budget_tier == BudgetTier::Low,
        "Stay in hostels or budget rentals and use public transport.",
    ),
    (
        |f| f.budget_tier == BudgetTier::Medium,
        "Use 3-star hotels and eat at mid-range restaurants.",
    ),
    (
        |f| f.budget_tier == BudgetTier::High,
        "Consider 4-star hotels, guided tours and premium transport.",
    ),
    (
        |f| f.trip_type == TripType::Beach,
        "Book waterfront stays early and plan outdoor time around the weather.",
    ),
    (
        |f| f.trip_type == TripType::Mountain,
        "Pack layers and leave slack in the schedule for weather and altitude.",
    ),
    (
        |f| f.trip_type == TripType::City,
        "Group sights by neighbourhood and use public transit between them.",
    ),
    (
        |f| f.params.has_constraint("family-friendly"),
        "Keep days short with kid-friendly stops and regular breaks.",
    ),
    (
        |f| f.params.has_constraint("vegetarian") || f.params.has_constraint("vegan"),
        "Shortlist restaurants with vegetarian or vegan menus ahead of time.",
    ),
    (
        |f| f.params.has_constraint("no flights"),
        "Plan ground transport between cities: train, bus or self-driving.",
    ),
    (
        |f| f.params.has_constraint("wheelchair accessible"),
        "Confirm step-free access at accommodation and attractions.",
    ),
    (
        |f| f.params.has_constraint("pet-friendly"),
        "Filter accommodation for pet-friendly listings.",
    ),
];

/// Rule engine. Stateless apart from its thresholds.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: RulesConfig,
}

impl RuleEngine {
    pub fn new(config: RulesConfig) -> Self {
        Self { config }
    }

    /// Infer trip type, budget tier and advice. Pure and total.
    pub fn infer(&self, params: &TripParameters) -> SymbolicInference {
        let trip_type = classify_trip_type(params.destination.as_deref());

        let budget_per_day = match (params.budget, params.duration_days) {
            (Some(budget), Some(days)) if days >= 1 => Some(budget / f64::from(days)),
            _ => None,
        };
        let budget_tier = budget_per_day.map_or(BudgetTier::Unknown, |per_day| self.tier(per_day));

        let facts = Facts {
            params,
            trip_type,
            budget_tier,
        };
        let mut advice: Vec<String> = ADVICE_RULES
            .iter()
            .filter(|(applies, _)| applies(&facts))
            .map(|(_, text)| text.to_string())
            .collect();
        if advice.is_empty() {
            advice.push(DEFAULT_ADVICE.to_string());
        }

        SymbolicInference {
            trip_type,
            budget_tier,
            budget_per_day,
            advice,
        }
    }

    fn tier(&self, per_day: f64) -> BudgetTier {
        if per_day < self.config.low_per_day {
            BudgetTier::Low
        } else if per_day < self.config.high_per_day {
            BudgetTier::Medium
        } else {
            BudgetTier::High
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RulesConfig::default())
    }
}

fn classify_trip_type(destination: Option<&str>) -> TripType {
    let Some(destination) = destination.filter(|d| !d.trim().is_empty()) else {
        return TripType::Unknown;
    };

    TRIP_TYPE_RULES
        .iter()
        .find(|(matches, _)| matches(destination))
        .map_or(TripType::City, |(_, trip_type)| *trip_type)
}

fn is_coastal_city(destination: &str) -> bool {
    gazetteer::lookup(destination).is_some_and(|c| c.geography == Geography::Coastal)
}

fn is_mountain_city(destination: &str) -> bool {
    gazetteer::lookup(destination).is_some_and(|c| c.geography == Geography::Mountain)
}

fn has_beach_keyword(destination: &str) -> bool {
    let lower = destination.to_lowercase();
    ["beach", "island", "coast"].iter().any(|k| lower.contains(k))
}

fn has_mountain_keyword(destination: &str) -> bool {
    let lower = destination.to_lowercase();
    ["mountain", "alps", "peak", "national park", "valley"]
        .iter()
        .any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(destination: Option<&str>, days: Option<u32>, budget: Option<f64>) -> TripParameters {
        TripParameters::new(
            None,
            destination.map(str::to_string),
            days,
            budget,
            vec![],
        )
    }

    #[test]
    fn test_all_unknown_gives_default_advice() {
        let inference = RuleEngine::default().infer(&TripParameters::default());

        assert_eq!(inference.trip_type, TripType::Unknown);
        assert_eq!(inference.budget_tier, BudgetTier::Unknown);
        assert_eq!(inference.budget_per_day, None);
        assert_eq!(inference.advice, vec![DEFAULT_ADVICE.to_string()]);
        assert!(inference.is_fully_unknown());
    }

    #[test]
    fn test_new_york_city_high_tier() {
        let inference = RuleEngine::default().infer(&params(Some("New York"), Some(3), Some(1500.0)));

        assert_eq!(inference.trip_type, TripType::City);
        assert_eq!(inference.budget_per_day, Some(500.0));
        assert_eq!(inference.budget_tier, BudgetTier::High);
        assert_eq!(
            inference.advice,
            vec![
                "Medium trip: balance sightseeing, food and leisure time.",
                "Consider 4-star hotels, guided tours and premium transport.",
                "Group sights by neighbourhood and use public transit between them.",
            ]
        );
    }

    #[test]
    fn test_tier_thresholds_are_per_day() {
        let engine = RuleEngine::default();
        let tier = |days, budget| engine.infer(&params(None, Some(days), Some(budget))).budget_tier;

        assert_eq!(tier(5, 450.0), BudgetTier::Low);
        assert_eq!(tier(5, 500.0), BudgetTier::Medium);
        assert_eq!(tier(5, 1499.0), BudgetTier::Medium);
        assert_eq!(tier(5, 1500.0), BudgetTier::High);
        assert_eq!(tier(1, 1500.0), BudgetTier::High);
        assert_eq!(tier(30, 1500.0), BudgetTier::Low);
    }

    #[test]
    fn test_missing_duration_never_divides() {
        let inference = RuleEngine::default().infer(&params(Some("Paris"), None, Some(900.0)));
        assert_eq!(inference.budget_tier, BudgetTier::Unknown);
        assert_eq!(inference.budget_per_day, None);
    }

    #[test]
    fn test_trip_type_table() {
        let engine = RuleEngine::default();
        let trip_type = |d: &str| engine.infer(&params(Some(d), None, None)).trip_type;

        assert_eq!(trip_type("Miami"), TripType::Beach);
        assert_eq!(trip_type("goa"), TripType::Beach);
        assert_eq!(trip_type("Denver"), TripType::Mountain);
        assert_eq!(trip_type("Manali"), TripType::Mountain);
        assert_eq!(trip_type("Chicago"), TripType::City);
        assert_eq!(trip_type("Yosemite National Park"), TripType::Mountain);
        assert_eq!(trip_type("Koh Samui Island"), TripType::Beach);
        assert_eq!(trip_type("Springfield"), TripType::City);
    }

    #[test]
    fn test_constraint_advice_follows_table_order() {
        let mut p = params(None, None, None);
        p.constraints = vec!["no flights".to_string(), "family-friendly".to_string()];
        let inference = RuleEngine::default().infer(&p);

        assert_eq!(
            inference.advice,
            vec![
                "Keep days short with kid-friendly stops and regular breaks.",
                "Plan ground transport between cities: train, bus or self-driving.",
            ]
        );
    }

    #[test]
    fn test_inference_is_pure() {
        let engine = RuleEngine::default();
        let p = params(Some("Denver"), Some(2), Some(150.0));
        assert_eq!(engine.infer(&p), engine.infer(&p));
    }
}
