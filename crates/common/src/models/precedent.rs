//! Precedent trips retrieved from the knowledge graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost categories, in the order they are always listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    Transport,
    Stay,
    Food,
    Attractions,
}

impl CostKind {
    pub const ALL: [CostKind; 4] = [
        CostKind::Transport,
        CostKind::Stay,
        CostKind::Food,
        CostKind::Attractions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostKind::Transport => "transport",
            CostKind::Stay => "stay",
            CostKind::Food => "food",
            CostKind::Attractions => "attractions",
        }
    }
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One category of a precedent's cost breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostCategory {
    pub category: CostKind,

    /// Plan entries in this category (flights, hotels, restaurants, sights)
    #[serde(default)]
    pub items: Vec<String>,

    /// Sum of the item costs that carried a price, if any did
    pub estimated_cost: Option<f64>,
}

impl CostCategory {
    pub fn empty(category: CostKind) -> Self {
        Self {
            category,
            items: Vec::new(),
            estimated_cost: None,
        }
    }
}

/// A recorded trip used as retrieval context. Read-only snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrecedentTrip {
    /// Graph node identifier; stable secondary sort key
    pub id: i64,
    pub origin: String,
    pub destination: String,
    pub duration_days: u32,
    pub budget: f64,
    #[serde(default)]
    pub people: Option<u32>,
    #[serde(default)]
    pub cost_breakdown: Vec<CostCategory>,
}

impl PrecedentTrip {
    /// Normalize the breakdown to exactly one entry per `CostKind`, in order.
    ///
    /// Duplicate categories are merged; missing ones are added empty.
    pub fn normalized(mut self) -> Self {
        let mut merged: Vec<CostCategory> = CostKind::ALL.iter().map(|k| CostCategory::empty(*k)).collect();

        for entry in self.cost_breakdown.drain(..) {
            let slot = &mut merged[entry.category as usize];
            slot.items.extend(entry.items);
            slot.estimated_cost = match (slot.estimated_cost, entry.estimated_cost) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            };
        }

        self.cost_breakdown = merged;
        self
    }

    pub fn cost(&self, kind: CostKind) -> Option<&CostCategory> {
        self.cost_breakdown.iter().find(|c| c.category == kind)
    }
}
