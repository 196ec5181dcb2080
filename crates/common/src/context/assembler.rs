//! Context Assembler - Builds the planning context and renders the prompt
//!
//! Provides:
//! - Precedent bounding
//! - Versioned, deterministic prompt template
//! - Prompt fingerprinting (SHA-256) for reproducibility checks in logs
//!
//! Rendering reads nothing but the `PlanningContext`. Every field appears
//! verbatim so distinct contexts never render to the same text.

use crate::models::{
    CostKind, PlanningContext, PrecedentTrip, Prompt, SymbolicInference, TripParameters,
};
use sha2::{Digest, Sha256};

/// Version tag of the prompt template below
pub const TEMPLATE_VERSION: &str = "trip-plan/v1";

/// Marker rendered in place of reference trips when there are none
pub const NO_PRECEDENTS_MARKER: &str = "No prior examples available.";

/// Rendered for any absent parameter
const UNKNOWN: &str = "unknown";

const PREAMBLE: &str = "You are an expert travel planner. Create a detailed day-by-day travel \
itinerary for the request described below. Use the symbolic inference as firm guidance and the \
reference trips, when present, as examples of real plans and costs.";

const ITINERARY_REQUIREMENTS: &str = "## Itinerary requirements
Include:
- Transportation recommendations
- Accommodation suggestions
- Meals and restaurants
- Activities and attractions
- Estimated costs where possible";

const FORMAT_REQUIREMENTS: &str = "## Format requirements
1. Use a heading for each day of the trip.
2. Write all cost calculations in plain text (e.g. \"$20 per day for 3 days = $60 total\").
3. Write price ranges with a dash (e.g. \"$100-150\").
4. Do not use LaTeX, formulas, or mathematical notation that may render incorrectly in markdown.
5. Avoid subscripts and superscripts.
6. Present costs in a table when listing multiple expenses.";

/// Context assembler
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_precedents: usize,
}

impl ContextAssembler {
    pub fn new(max_precedents: usize) -> Self {
        Self { max_precedents }
    }

    pub fn max_precedents(&self) -> usize {
        self.max_precedents
    }

    /// Merge the pipeline outputs. Precedents beyond the limit are dropped.
    pub fn assemble(
        &self,
        parameters: TripParameters,
        inference: SymbolicInference,
        mut precedents: Vec<PrecedentTrip>,
    ) -> PlanningContext {
        precedents.truncate(self.max_precedents);
        PlanningContext {
            parameters,
            inference,
            precedents,
            precedent_limit: self.max_precedents,
        }
    }

    /// Render the context through the fixed template
    pub fn render(&self, context: &PlanningContext) -> Prompt {
        let mut text = String::new();

        text.push_str(PREAMBLE);
        text.push_str("\n\n");
        render_parameters(&mut text, &context.parameters);
        text.push('\n');
        render_inference(&mut text, &context.inference);
        text.push('\n');
        render_precedents(&mut text, &context.precedents, context.precedent_limit);
        text.push('\n');
        text.push_str(ITINERARY_REQUIREMENTS);
        text.push_str("\n\n");
        text.push_str(FORMAT_REQUIREMENTS);
        text.push('\n');

        let fingerprint = fingerprint(&text);
        Prompt {
            text,
            template_version: TEMPLATE_VERSION.to_string(),
            fingerprint,
        }
    }
}

fn render_parameters(out: &mut String, params: &TripParameters) {
    out.push_str("## Trip parameters\n");
    out.push_str(&format!("- Origin: {}\n", params.origin.as_deref().unwrap_or(UNKNOWN)));
    out.push_str(&format!(
        "- Destination: {}\n",
        params.destination.as_deref().unwrap_or(UNKNOWN)
    ));
    out.push_str(&format!(
        "- Duration: {}\n",
        params.duration_days.map_or(UNKNOWN.to_string(), days)
    ));
    out.push_str(&format!(
        "- Budget: {}\n",
        params.budget.map_or(UNKNOWN.to_string(), money)
    ));
    if params.constraints.is_empty() {
        out.push_str("- Constraints: none\n");
    } else {
        out.push_str("- Constraints:\n");
        for constraint in &params.constraints {
            out.push_str(&format!("  - {}\n", constraint));
        }
    }
}

fn render_inference(out: &mut String, inference: &SymbolicInference) {
    out.push_str("## Symbolic inference\n");
    out.push_str(&format!("- Trip type: {}\n", inference.trip_type));
    out.push_str(&format!("- Budget tier: {}\n", inference.budget_tier));
    out.push_str(&format!(
        "- Budget per day: {}\n",
        inference.budget_per_day.map_or(UNKNOWN.to_string(), rounded_money)
    ));
    out.push_str("- Advice:\n");
    for (i, advice) in inference.advice.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, advice));
    }
}

fn render_precedents(out: &mut String, precedents: &[PrecedentTrip], limit: usize) {
    out.push_str("## Reference trips\n");
    if precedents.is_empty() {
        out.push_str(NO_PRECEDENTS_MARKER);
        out.push('\n');
        return;
    }

    out.push_str(&format!(
        "{} recorded trip(s), at most {} shown.\n",
        precedents.len(),
        limit
    ));
    for (i, trip) in precedents.iter().enumerate() {
        out.push_str(&format!(
            "\n### Trip {}: {} to {}\n",
            i + 1,
            trip.origin,
            trip.destination
        ));
        out.push_str(&format!("- Duration: {}\n", days(trip.duration_days)));
        out.push_str(&format!("- Budget: {}\n", money(trip.budget)));
        out.push_str(&format!(
            "- Travelers: {}\n",
            trip.people.map_or(UNKNOWN.to_string(), |p| p.to_string())
        ));
        for kind in CostKind::ALL {
            render_cost(out, trip, kind);
        }
    }
}

fn render_cost(out: &mut String, trip: &PrecedentTrip, kind: CostKind) {
    let label = match kind {
        CostKind::Transport => "Transport",
        CostKind::Stay => "Stay",
        CostKind::Food => "Food",
        CostKind::Attractions => "Attractions",
    };

    let Some(category) = trip.cost(kind).filter(|c| !c.items.is_empty()) else {
        out.push_str(&format!("- {}: none recorded\n", label));
        return;
    };

    let estimate = category
        .estimated_cost
        .map_or(String::new(), |c| format!(" (estimated {})", money(c)));
    out.push_str(&format!("- {}{}:\n", label, estimate));
    for item in &category.items {
        out.push_str(&format!("  - {}\n", item));
    }
}

fn days(count: u32) -> String {
    if count == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", count)
    }
}

/// Dollar amount exactly as given: `$1500`, `$512.5`, `$1500.004`
fn money(value: f64) -> String {
    format!("${}", value)
}

/// Derived amounts, to the cent without trailing zeros: `$214.29`
fn rounded_money(value: f64) -> String {
    format!("${}", amount(value))
}

fn amount(value: f64) -> String {
    let cents = format!("{:.2}", value);
    cents.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Hex SHA-256 of the prompt text
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
