//! Planning context, rendered prompt and generated itinerary

use super::{PrecedentTrip, SymbolicInference, TripParameters, TripQuery};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything prompt rendering needs, and nothing else
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanningContext {
    pub parameters: TripParameters,
    pub inference: SymbolicInference,

    /// Ranked precedents, at most `precedent_limit`
    pub precedents: Vec<PrecedentTrip>,
    pub precedent_limit: usize,
}

/// A rendered prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub template_version: String,

    /// Hex SHA-256 of `text`
    pub fingerprint: String,
}

/// Result of the deterministic half of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningOutcome {
    pub query: TripQuery,
    pub context: PlanningContext,
    pub prompt: Prompt,
}

impl PlanningOutcome {
    /// Nothing extracted, nothing inferred, nothing retrieved
    pub fn is_empty(&self) -> bool {
        self.context.parameters.is_empty()
            && self.context.inference.is_fully_unknown()
            && self.context.precedents.is_empty()
    }
}

/// Generated itinerary text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub request_id: Uuid,
    pub prompt: Prompt,
    pub text: String,

    /// Model that produced `text`
    pub model: String,
}
