//! Symbolic inference produced by the rule engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    City,
    Beach,
    Mountain,
    Unknown,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::City => "city",
            TripType::Beach => "beach",
            TripType::Mountain => "mountain",
            TripType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TripType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending band, computed per day of travel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Low,
    Medium,
    High,
    Unknown,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Low => "low",
            BudgetTier::Medium => "medium",
            BudgetTier::High => "high",
            BudgetTier::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic conclusions drawn from `TripParameters`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolicInference {
    pub trip_type: TripType,
    pub budget_tier: BudgetTier,

    /// Budget divided by duration, when both are known
    pub budget_per_day: Option<f64>,

    /// Advice lines in rule priority order; never empty
    pub advice: Vec<String>,
}

impl SymbolicInference {
    pub fn is_fully_unknown(&self) -> bool {
        self.trip_type == TripType::Unknown && self.budget_tier == BudgetTier::Unknown
    }
}
