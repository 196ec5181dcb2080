//! Planning Engine Core Components
//!
//! The planning engine is the reasoning layer that provides:
//! - Trip parameter extraction
//! - Symbolic inference (trip type, budget tier, advice)
//! - Context assembly and prompt rendering
//! - Itinerary generation through an external model

pub mod assembler;
pub mod extractor;
pub mod generation;
pub mod planner;
pub mod rules;

pub use assembler::{ContextAssembler, NO_PRECEDENTS_MARKER, TEMPLATE_VERSION};
pub use extractor::TripExtractor;
pub use generation::{build_gateway, GenerationGateway, OllamaGateway, OpenAiGateway};
pub use planner::TripPlanner;
pub use rules::{RuleEngine, DEFAULT_ADVICE};
