//! Domain models shared by every pipeline stage
//!
//! Each request builds its own chain of these values:
//! `TripQuery` → `TripParameters` → `SymbolicInference` + `PrecedentTrip`s
//! → `PlanningContext` → `Prompt` → `Itinerary`.
//! Nothing here is shared or mutated across requests.

pub mod inference;
pub mod plan;
pub mod precedent;
pub mod trip;

pub use inference::{BudgetTier, SymbolicInference, TripType};
pub use plan::{Itinerary, PlanningContext, PlanningOutcome, Prompt};
pub use precedent::{CostCategory, CostKind, PrecedentTrip};
pub use trip::{TripParameters, TripQuery};
