//! Trip Planner - The end-to-end planning pipeline
//!
//! One linear pass per request:
//! extract → (infer ∥ retrieve) → assemble → render → generate.
//!
//! Everything up to the rendered prompt is infallible. Only generation,
//! and refusing an empty query, can fail a request.

use super::assembler::ContextAssembler;
use super::extractor::TripExtractor;
use super::generation::{build_gateway, GenerationGateway};
use super::rules::RuleEngine;
use crate::config::{AppConfig, EmptyQueryPolicy};
use crate::errors::{AppError, Result};
use crate::graph::{self, KnowledgeGraph};
use crate::metrics;
use crate::models::{Itinerary, PlanningOutcome, Prompt, TripQuery};
use crate::retrieval::Retriever;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// The planning pipeline. Shared across requests behind an `Arc`.
pub struct TripPlanner {
    extractor: TripExtractor,
    rules: RuleEngine,
    retriever: Retriever,
    assembler: ContextAssembler,
    gateway: Arc<dyn GenerationGateway>,
    empty_query_policy: EmptyQueryPolicy,
    generation_timeout: Duration,
}

impl TripPlanner {
    /// Connect every collaborator named in `config`
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let graph = graph::connect(&config.graph).await?;
        let gateway = build_gateway(&config.generation)?;
        Self::new(config, graph, gateway)
    }

    /// Build around an existing graph and gateway
    pub fn new(
        config: &AppConfig,
        graph: Arc<dyn KnowledgeGraph>,
        gateway: Arc<dyn GenerationGateway>,
    ) -> Result<Self> {
        Ok(Self {
            extractor: TripExtractor::new(&config.extraction)?,
            rules: RuleEngine::new(config.rules.clone()),
            retriever: Retriever::new(graph, config.retrieval.clone(), config.graph_timeout()),
            assembler: ContextAssembler::new(config.planner.max_precedents),
            gateway,
            empty_query_policy: config.planner.empty_query_policy,
            generation_timeout: config.generation_timeout(),
        })
    }

    /// Model used for generation
    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    /// Readiness: the knowledge graph answers
    pub async fn ready(&self) -> Result<()> {
        self.retriever.ping().await
    }

    /// Run the deterministic half of the pipeline
    #[instrument(skip(self, query), fields(request_id = %query.request_id))]
    pub async fn prepare(&self, query: &TripQuery) -> PlanningOutcome {
        let started = Instant::now();

        let parameters = self.extractor.extract(&query.text).await;

        // Inference and retrieval only depend on the parameters
        let (inference, precedents) = tokio::join!(
            async { self.rules.infer(&parameters) },
            self.retriever.retrieve(&parameters, self.assembler.max_precedents()),
        );

        let context = self.assembler.assemble(parameters, inference, precedents);
        let prompt = self.assembler.render(&context);

        info!(
            fields = ?context.parameters.present_fields(),
            trip_type = %context.inference.trip_type,
            budget_tier = %context.inference.budget_tier,
            precedents = context.precedents.len(),
            fingerprint = %prompt.fingerprint,
            latency_ms = started.elapsed().as_millis() as u64,
            "Prompt assembled"
        );

        PlanningOutcome {
            query: query.clone(),
            context,
            prompt,
        }
    }

    /// Render the prompt for a raw query
    pub async fn plan(&self, text: &str) -> Result<Prompt> {
        let query = validated_query(text)?;
        Ok(self.prepare(&query).await.prompt)
    }

    /// Prepare and generate an itinerary
    pub async fn plan_itinerary(&self, query: &TripQuery) -> Result<Itinerary> {
        if query.text.trim().is_empty() {
            return Err(empty_query_error());
        }
        let outcome = self.prepare(query).await;
        self.generate(&outcome).await
    }

    /// Apply the empty-query policy, then call the generation gateway once
    #[instrument(skip(self, outcome), fields(request_id = %outcome.query.request_id))]
    pub async fn generate(&self, outcome: &PlanningOutcome) -> Result<Itinerary> {
        if outcome.is_empty() && self.empty_query_policy == EmptyQueryPolicy::Refuse {
            warn!("Nothing extracted from query, refusing to generate");
            return Err(AppError::NothingExtracted);
        }

        let started = Instant::now();
        let result = match tokio::time::timeout(self.generation_timeout, self.gateway.generate(&outcome.prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::GenerationTimeout {
                timeout_secs: self.generation_timeout.as_secs(),
            }),
        };
        let elapsed = started.elapsed();
        metrics::record_generation(elapsed.as_secs_f64(), self.gateway.model(), result.is_ok());

        let text = result.map_err(|e| {
            error!(model = self.gateway.model(), error = %e, "Itinerary generation failed");
            e
        })?;

        info!(
            model = self.gateway.model(),
            chars = text.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Itinerary generated"
        );

        Ok(Itinerary {
            request_id: outcome.query.request_id,
            prompt: outcome.prompt.clone(),
            text,
            model: self.gateway.model().to_string(),
        })
    }
}

fn validated_query(text: &str) -> Result<TripQuery> {
    if text.trim().is_empty() {
        return Err(empty_query_error());
    }
    Ok(TripQuery::new(text))
}

fn empty_query_error() -> AppError {
    AppError::Validation {
        message: "Query must not be empty".to_string(),
        field: Some("query".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::assembler::NO_PRECEDENTS_MARKER;
    use crate::graph::InMemoryGraph;
    use crate::models::{BudgetTier, PrecedentTrip, TripType};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Gateway double that counts calls
    struct FakeGateway {
        calls: AtomicUsize,
        fail: bool,
        delay: Option<Duration>,
    }

    impl FakeGateway {
        fn ok() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false, delay: None })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: true, delay: None })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false, delay: Some(delay) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationGateway for FakeGateway {
        async fn generate(&self, prompt: &Prompt) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AppError::GenerationUnavailable {
                    message: "connection refused".to_string(),
                });
            }
            Ok(format!("Day 1: itinerary for {}", prompt.fingerprint))
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn planner_with(config: AppConfig, trips: Vec<PrecedentTrip>, gateway: Arc<FakeGateway>) -> TripPlanner {
        TripPlanner::new(&config, Arc::new(InMemoryGraph::new(trips)), gateway).unwrap()
    }

    fn planner(trips: Vec<PrecedentTrip>, gateway: Arc<FakeGateway>) -> TripPlanner {
        planner_with(AppConfig::default(), trips, gateway)
    }

    fn precedent() -> PrecedentTrip {
        PrecedentTrip {
            id: 42,
            origin: "Kansas City".to_string(),
            destination: "New York".to_string(),
            duration_days: 3,
            budget: 1400.0,
            people: Some(2),
            cost_breakdown: vec![],
        }
    }

    const KANSAS_CITY_QUERY: &str = "Plan a 3-day trip from Kansas City to New York with $1500 budget";

    #[tokio::test]
    async fn test_kansas_city_scenario_without_precedents() {
        let planner = planner(vec![], FakeGateway::ok());
        let outcome = planner.prepare(&TripQuery::new(KANSAS_CITY_QUERY)).await;

        let params = &outcome.context.parameters;
        assert_eq!(params.origin.as_deref(), Some("Kansas City"));
        assert_eq!(params.destination.as_deref(), Some("New York"));
        assert_eq!(params.duration_days, Some(3));
        assert_eq!(params.budget, Some(1500.0));

        let inference = &outcome.context.inference;
        assert_eq!(inference.trip_type, TripType::City);
        assert_eq!(inference.budget_per_day, Some(500.0));
        assert_eq!(inference.budget_tier, BudgetTier::High);
        assert!(!inference.advice.is_empty());

        let text = &outcome.prompt.text;
        for value in ["Kansas City", "New York", "3 days", "$1500"] {
            assert!(text.contains(value), "prompt is missing {}", value);
        }
        assert!(text.contains(NO_PRECEDENTS_MARKER));
    }

    #[tokio::test]
    async fn test_kansas_city_scenario_with_precedents() {
        let planner = planner(vec![precedent()], FakeGateway::ok());
        let prompt = planner.plan(KANSAS_CITY_QUERY).await.unwrap();

        assert!(prompt.text.contains("### Trip 1: Kansas City to New York"));
        assert!(!prompt.text.contains(NO_PRECEDENTS_MARKER));
    }

    #[tokio::test]
    async fn test_vague_query_renders_markers() {
        let planner = planner(vec![precedent()], FakeGateway::ok());
        let outcome = planner.prepare(&TripQuery::new("I want to travel somewhere")).await;

        assert!(outcome.context.parameters.is_empty());
        assert_eq!(outcome.context.inference.trip_type, TripType::Unknown);
        assert_eq!(outcome.context.inference.budget_tier, BudgetTier::Unknown);
        assert_eq!(
            outcome.context.inference.advice,
            vec!["Insufficient information for tailored advice.".to_string()]
        );
        assert!(outcome.context.precedents.is_empty());
        assert!(outcome.prompt.text.contains("- Destination: unknown"));
        assert!(outcome.prompt.text.contains(NO_PRECEDENTS_MARKER));
    }

    #[tokio::test]
    async fn test_prompt_is_reproducible() {
        let planner = planner(vec![precedent()], FakeGateway::ok());
        let a = planner.plan(KANSAS_CITY_QUERY).await.unwrap();
        let b = planner.plan(KANSAS_CITY_QUERY).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_empty_query_refused_without_generation() {
        let gateway = FakeGateway::ok();
        let planner = planner(vec![], gateway.clone());

        let err = planner
            .plan_itinerary(&TripQuery::new("I want to travel somewhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NothingExtracted));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_minimal_prompt_policy_still_generates() {
        let gateway = FakeGateway::ok();
        let mut config = AppConfig::default();
        config.planner.empty_query_policy = EmptyQueryPolicy::MinimalPrompt;
        let planner = planner_with(config, vec![], gateway.clone());

        let itinerary = planner
            .plan_itinerary(&TripQuery::new("I want to travel somewhere"))
            .await
            .unwrap();
        assert_eq!(gateway.calls(), 1);
        assert_eq!(itinerary.model, "fake-model");
        assert!(itinerary.text.contains(&itinerary.prompt.fingerprint));
    }

    #[tokio::test]
    async fn test_generation_failure_is_not_retried() {
        let gateway = FakeGateway::failing();
        let planner = planner(vec![], gateway.clone());

        let err = planner
            .plan_itinerary(&TripQuery::new(KANSAS_CITY_QUERY))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationUnavailable { .. }));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let gateway = FakeGateway::slow(Duration::from_secs(10));
        let mut config = AppConfig::default();
        config.generation.timeout_secs = 1;
        let planner = planner_with(config, vec![], gateway.clone());

        let err = planner
            .plan_itinerary(&TripQuery::new(KANSAS_CITY_QUERY))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GenerationTimeout { timeout_secs: 1 }));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_itinerary_carries_request_id() {
        let planner = planner(vec![], FakeGateway::ok());
        let query = TripQuery::new(KANSAS_CITY_QUERY);
        let itinerary = planner.plan_itinerary(&query).await.unwrap();
        assert_eq!(itinerary.request_id, query.request_id);
    }

    #[tokio::test]
    async fn test_blank_query_is_a_validation_error() {
        let planner = planner(vec![], FakeGateway::ok());
        let err = planner.plan("   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
