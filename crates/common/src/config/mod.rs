//! Configuration management for TripForge services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - TOML files under `config/` (`default`, `{APP_ENV}`, `local`)
//! - Default values
//!
//! `AppConfig::validate` is called once at startup; a malformed
//! configuration never reaches request handling.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Knowledge graph connection
    #[serde(default)]
    pub graph: GraphConfig,

    /// Entity extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Text generation service
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Precedent retrieval
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Pipeline policy
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Rule engine thresholds
    #[serde(default)]
    pub rules: RulesConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Which knowledge graph implementation to talk to
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    /// Neo4j over the HTTP transactional endpoint
    Neo4j,
    /// In-process graph seeded from a JSON file
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_backend")]
    pub backend: GraphBackend,

    /// Neo4j HTTP base URL, e.g. http://localhost:7474
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    #[serde(default = "default_graph_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Neo4j database name
    #[serde(default = "default_graph_database")]
    pub database: String,

    /// JSON file of precedent trips for the memory backend
    pub seed_path: Option<String>,

    /// Per-query timeout in milliseconds
    #[serde(default = "default_graph_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// External NER endpoint; the built-in gazetteer is used when absent
    pub ner_endpoint: Option<String>,

    /// NER request timeout in milliseconds
    #[serde(default = "default_ner_timeout")]
    pub ner_timeout_ms: u64,

    /// More locations than this leaves origin and destination absent
    #[serde(default = "default_max_locations")]
    pub max_locations: usize,

    /// Durations above this are treated as noise
    #[serde(default = "default_max_duration_days")]
    pub max_duration_days: u32,
}

/// Generation provider wire format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    Ollama,
    Openai,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: GenerationProvider,

    /// Base URL (ollama) or full chat-completions URL (openai)
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// API key (openai only)
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Context window requested from the model server
    #[serde(default = "default_context_window")]
    pub context_window: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Candidates fetched per requested precedent
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// Hard cap on rows requested from the graph in one query
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Look up nearby known cities when matching destinations
    #[serde(default = "default_enabled")]
    pub nearby_fallback: bool,
}

/// What to do when nothing could be extracted from a query
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyQueryPolicy {
    /// Fail the request with `NothingExtracted`
    Refuse,
    /// Generate from the minimal prompt anyway
    MinimalPrompt,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Maximum precedents placed in a planning context
    #[serde(default = "default_max_precedents")]
    pub max_precedents: usize,

    #[serde(default = "default_empty_query_policy")]
    pub empty_query_policy: EmptyQueryPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    /// Per-day budget below this is `low`
    #[serde(default = "default_low_per_day")]
    pub low_per_day: f64,

    /// Per-day budget at or above this is `high`
    #[serde(default = "default_high_per_day")]
    pub high_per_day: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_graph_backend() -> GraphBackend { GraphBackend::Neo4j }
fn default_graph_uri() -> String { "http://localhost:7474".to_string() }
fn default_graph_user() -> String { "neo4j".to_string() }
fn default_graph_database() -> String { "neo4j".to_string() }
fn default_graph_timeout() -> u64 { 3000 }
fn default_ner_timeout() -> u64 { 2000 }
fn default_max_locations() -> usize { 3 }
fn default_max_duration_days() -> u32 { 365 }
fn default_generation_provider() -> GenerationProvider { GenerationProvider::Ollama }
fn default_generation_endpoint() -> String { "http://localhost:11434".to_string() }
fn default_generation_model() -> String { "llama3.1".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_top_p() -> f32 { 0.9 }
fn default_max_tokens() -> u32 { 1024 }
fn default_context_window() -> u32 { 4096 }
fn default_generation_timeout() -> u64 { 90 }
fn default_candidate_multiplier() -> usize { 4 }
fn default_max_candidates() -> usize { 100 }
fn default_max_precedents() -> usize { 3 }
fn default_empty_query_policy() -> EmptyQueryPolicy { EmptyQueryPolicy::Refuse }
fn default_low_per_day() -> f64 { 100.0 }
fn default_high_per_day() -> f64 { 300.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__GRAPH__PASSWORD=secret
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject configurations that cannot serve a single request
    pub fn validate(&self) -> Result<()> {
        match self.graph.backend {
            GraphBackend::Neo4j => {
                require_non_empty("graph.uri", &self.graph.uri)?;
                require_non_empty("graph.user", &self.graph.user)?;
                require_non_empty("graph.password", &self.graph.password)?;
                require_non_empty("graph.database", &self.graph.database)?;
                if !self.graph.uri.starts_with("http://") && !self.graph.uri.starts_with("https://") {
                    return Err(config_error(format!(
                        "graph.uri must be an http(s) URL, got '{}'",
                        self.graph.uri
                    )));
                }
            }
            GraphBackend::Memory => {
                if self.graph.seed_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
                    return Err(config_error("graph.seed_path is required for the memory backend"));
                }
            }
        }

        if self.graph.timeout_ms == 0 {
            return Err(config_error("graph.timeout_ms must be positive"));
        }

        require_non_empty("generation.endpoint", &self.generation.endpoint)?;
        require_non_empty("generation.model", &self.generation.model)?;
        if self.generation.provider == GenerationProvider::Openai
            && self.generation.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(config_error("generation.api_key is required for the openai provider"));
        }
        if self.generation.timeout_secs == 0 {
            return Err(config_error("generation.timeout_secs must be positive"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(config_error("generation.temperature must be within 0.0..=2.0"));
        }

        if self.planner.max_precedents == 0 {
            return Err(config_error("planner.max_precedents must be at least 1"));
        }
        if self.retrieval.candidate_multiplier == 0 || self.retrieval.max_candidates == 0 {
            return Err(config_error("retrieval limits must be positive"));
        }
        if self.extraction.max_locations < 2 {
            return Err(config_error("extraction.max_locations must be at least 2"));
        }

        if !(self.rules.low_per_day > 0.0 && self.rules.low_per_day < self.rules.high_per_day) {
            return Err(config_error(format!(
                "rules thresholds must satisfy 0 < low_per_day ({}) < high_per_day ({})",
                self.rules.low_per_day, self.rules.high_per_day
            )));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0)
        {
            return Err(config_error("rate_limit values must be positive when enabled"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get knowledge graph query timeout as Duration
    pub fn graph_timeout(&self) -> Duration {
        Duration::from_millis(self.graph.timeout_ms)
    }

    /// Get generation timeout as Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation.timeout_secs)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(config_error(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::Configuration {
        message: message.into(),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: default_graph_backend(),
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: String::new(),
            database: default_graph_database(),
            seed_path: None,
            timeout_ms: default_graph_timeout(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ner_endpoint: None,
            ner_timeout_ms: default_ner_timeout(),
            max_locations: default_max_locations(),
            max_duration_days: default_max_duration_days(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            endpoint: default_generation_endpoint(),
            api_key: None,
            model: default_generation_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            context_window: default_context_window(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_multiplier: default_candidate_multiplier(),
            max_candidates: default_max_candidates(),
            nearby_fallback: default_enabled(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_precedents: default_max_precedents(),
            empty_query_policy: default_empty_query_policy(),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            low_per_day: default_low_per_day(),
            high_per_day: default_high_per_day(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            graph: GraphConfig::default(),
            extraction: ExtractionConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            planner: PlannerConfig::default(),
            rules: RulesConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
