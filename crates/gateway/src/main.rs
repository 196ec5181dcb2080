//! TripForge API Gateway
//!
//! The HTTP front end for the planning pipeline.
//! Handles:
//! - Rate limiting
//! - Request routing and validation
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tripforge_common::{config::AppConfig, metrics, TripPlanner};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub planner: Arc<TripPlanner>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config);
    info!("Starting TripForge API Gateway v{}", tripforge_common::VERSION);

    config.validate().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    install_prometheus(&config)?;

    // Build the planning pipeline
    info!(
        graph = ?config.graph.backend,
        provider = ?config.generation.provider,
        model = %config.generation.model,
        "Initializing trip planner..."
    );
    let planner = Arc::new(TripPlanner::from_config(&config).await?);

    let state = AppState {
        config: config.clone(),
        planner,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on their own port (0 disables)
fn install_prometheus(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.observability.metrics_port;
    if port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_request_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_retrieval_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_generation_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::GENERATION_BUCKETS,
        )?
        .install()?;

    info!(port, "Metrics exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Planning routes are rate limited; probes are not
    let mut plan_routes = Router::new()
        .route("/plan", post(handlers::plan::plan))
        .route("/plan/prompt", post(handlers::plan::plan_prompt));

    let rate_limit = &state.config.rate_limit;
    if rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            rate_limit.requests_per_second,
            rate_limit.burst,
        );
        plan_routes = plan_routes.layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // API routes
    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(plan_routes);

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(from_fn(middleware::metrics::track_requests))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tripforge_common::{
        context::GenerationGateway,
        errors::{AppError, Result},
        graph::InMemoryGraph,
        models::{PrecedentTrip, Prompt},
    };

    struct EchoGateway {
        fail: bool,
    }

    struct StalledGateway;

    #[async_trait::async_trait]
    impl GenerationGateway for StalledGateway {
        async fn generate(&self, _prompt: &Prompt) -> Result<String> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }

        fn model(&self) -> &str {
            "stalled"
        }
    }

    #[async_trait::async_trait]
    impl GenerationGateway for EchoGateway {
        async fn generate(&self, prompt: &Prompt) -> Result<String> {
            if self.fail {
                return Err(AppError::GenerationUnavailable {
                    message: "model server down".to_string(),
                });
            }
            Ok(format!("Day 1 ({})", prompt.template_version))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn app_with(config: AppConfig, fail: bool) -> Router {
        let graph = InMemoryGraph::new(vec![PrecedentTrip {
            id: 1,
            origin: "Kansas City".to_string(),
            destination: "New York".to_string(),
            duration_days: 3,
            budget: 1400.0,
            people: Some(2),
            cost_breakdown: vec![],
        }]);
        let planner = TripPlanner::new(&config, Arc::new(graph), Arc::new(EchoGateway { fail })).unwrap();
        create_router(AppState {
            config: Arc::new(config),
            planner: Arc::new(planner),
        })
    }

    fn app() -> Router {
        app_with(AppConfig::default(), false)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_ready_with_memory_graph() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_plan_prompt() {
        let query = "Plan a 3-day trip from Kansas City to New York with $1500 budget";
        let response = app()
            .oneshot(post_json("/v1/plan/prompt", json!({ "query": query })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["parameters"]["origin"], "Kansas City");
        assert_eq!(body["parameters"]["destination"], "New York");
        assert_eq!(body["inference"]["budget_tier"], "high");
        assert_eq!(body["precedents"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["template_version"], "trip-plan/v1");
        assert!(body["prompt"].as_str().unwrap().contains("Kansas City"));
    }

    #[tokio::test]
    async fn test_plan_generates_itinerary() {
        let query = "Plan a 3-day trip from Kansas City to New York with $1500 budget";
        let response = app()
            .oneshot(post_json("/v1/plan", json!({ "query": query })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["itinerary"], "Day 1 (trip-plan/v1)");
        assert_eq!(body["model"], "echo");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let response = app()
            .oneshot(post_json("/v1/plan/prompt", json!({ "query": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_vague_query_refused_on_plan() {
        let response = app()
            .oneshot(post_json("/v1/plan", json!({ "query": "I want to travel somewhere" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_generation_failure_is_structured() {
        let query = "Plan a 3-day trip from Kansas City to New York with $1500 budget";
        let response = app_with(AppConfig::default(), true)
            .oneshot(post_json("/v1/plan", json!({ "query": query })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("itinerary generation service"));
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let mut config = AppConfig::default();
        config.server.request_timeout_secs = 1;
        let planner = TripPlanner::new(&config, Arc::new(InMemoryGraph::default()), Arc::new(StalledGateway)).unwrap();
        let app = create_router(AppState {
            config: Arc::new(config),
            planner: Arc::new(planner),
        });

        let query = "Plan a 3-day trip from Kansas City to New York with $1500 budget";
        let response = app
            .oneshot(post_json("/v1/plan", json!({ "query": query })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_plan_routes() {
        let mut config = AppConfig::default();
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = app_with(config, false);

        let body = json!({ "query": "3 days in Paris" });
        let first = app.clone().oneshot(post_json("/v1/plan/prompt", body.clone())).await.unwrap();
        let second = app.clone().oneshot(post_json("/v1/plan/prompt", body)).await.unwrap();
        let health = app
            .oneshot(Request::builder().uri("/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(health.status(), StatusCode::OK);
    }
}
