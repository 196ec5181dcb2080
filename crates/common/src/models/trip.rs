//! Trip query and extracted parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw planning request as received from a front end
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripQuery {
    pub request_id: Uuid,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl TripQuery {
    /// Create a query with a fresh request id
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), text)
    }

    /// Create a query under a caller-provided id (e.g. the HTTP request id)
    pub fn with_id(request_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            request_id,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Structured trip parameters extracted from a query.
///
/// Absent fields are `None`, never placeholder strings or zeroes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TripParameters {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub duration_days: Option<u32>,
    pub budget: Option<f64>,
    pub constraints: Vec<String>,
}

impl TripParameters {
    /// Build parameters, dropping values that violate the field invariants
    /// (duration below one day, negative or non-finite budget, blank names).
    pub fn new(
        origin: Option<String>,
        destination: Option<String>,
        duration_days: Option<u32>,
        budget: Option<f64>,
        constraints: Vec<String>,
    ) -> Self {
        Self {
            origin: origin.filter(|s| !s.trim().is_empty()),
            destination: destination.filter(|s| !s.trim().is_empty()),
            duration_days: duration_days.filter(|d| *d >= 1),
            budget: budget.filter(|b| b.is_finite() && *b >= 0.0),
            constraints,
        }
    }

    /// True when nothing at all could be extracted
    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
            && self.destination.is_none()
            && self.duration_days.is_none()
            && self.budget.is_none()
            && self.constraints.is_empty()
    }

    /// Names of the fields that are present, for logs and metrics
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.origin.is_some() {
            fields.push("origin");
        }
        if self.destination.is_some() {
            fields.push("destination");
        }
        if self.duration_days.is_some() {
            fields.push("duration_days");
        }
        if self.budget.is_some() {
            fields.push("budget");
        }
        if !self.constraints.is_empty() {
            fields.push("constraints");
        }
        fields
    }

    pub fn has_constraint(&self, constraint: &str) -> bool {
        self.constraints.iter().any(|c| c.eq_ignore_ascii_case(constraint))
    }
}
