//! Trip planning handlers

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use tripforge_common::{
    errors::{AppError, Result},
    models::{PlanningOutcome, PrecedentTrip, SymbolicInference, TripParameters, TripQuery},
};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Planning request
#[derive(Debug, Deserialize, Validate)]
pub struct PlanRequest {
    /// Free-form travel query
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

/// Prompt-only response
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub request_id: Uuid,
    pub parameters: TripParameters,
    pub inference: SymbolicInference,
    pub precedents: Vec<PrecedentTrip>,
    pub prompt: String,
    pub template_version: String,
    pub fingerprint: String,
    pub processing_time_ms: u64,
}

/// Full planning response
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub prompt: PromptResponse,
    pub itinerary: String,
    pub model: String,
}

impl PromptResponse {
    fn from_outcome(outcome: PlanningOutcome, started: Instant) -> Self {
        let PlanningOutcome { query, context, prompt } = outcome;
        Self {
            request_id: query.request_id,
            parameters: context.parameters,
            inference: context.inference,
            precedents: context.precedents,
            prompt: prompt.text,
            template_version: prompt.template_version,
            fingerprint: prompt.fingerprint,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Render the planning prompt without calling the generation service
pub async fn plan_prompt(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PromptResponse>> {
    let started = Instant::now();
    let query = trip_query(&headers, request)?;

    let outcome = state.planner.prepare(&query).await;

    Ok(Json(PromptResponse::from_outcome(outcome, started)))
}

/// Render the prompt and generate an itinerary
pub async fn plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>> {
    let started = Instant::now();
    let query = trip_query(&headers, request)?;

    let outcome = state.planner.prepare(&query).await;
    let itinerary = state.planner.generate(&outcome).await?;

    tracing::info!(
        request_id = %query.request_id,
        model = %itinerary.model,
        latency_ms = started.elapsed().as_millis() as u64,
        "Plan completed"
    );

    Ok(Json(PlanResponse {
        prompt: PromptResponse::from_outcome(outcome, started),
        itinerary: itinerary.text,
        model: itinerary.model,
    }))
}

/// Validate the request and tag it with the HTTP request id
fn trip_query(headers: &HeaderMap, request: PlanRequest) -> Result<TripQuery> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    if request.query.trim().is_empty() {
        return Err(AppError::Validation {
            message: "Query must not be empty".to_string(),
            field: Some("query".to_string()),
        });
    }

    Ok(TripQuery::with_id(request_id(headers), request.query))
}

fn request_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4)
}
