//! Generation Gateway - Turns a rendered prompt into itinerary text
//!
//! Provides:
//! - Ollama `/api/generate` client (local models)
//! - OpenAI-compatible chat-completions client
//!
//! Each call is attempted once. Failures surface to the caller as
//! `GenerationUnavailable` or `GenerationTimeout`.

use crate::config::{GenerationConfig, GenerationProvider};
use crate::errors::{AppError, Result};
use crate::models::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are an expert travel planner.";

/// Text generation service
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate itinerary text for `prompt`
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Model identifier, for logs and responses
    fn model(&self) -> &str;
}

/// Build the configured gateway
pub fn build_gateway(config: &GenerationConfig) -> Result<Arc<dyn GenerationGateway>> {
    Ok(match config.provider {
        GenerationProvider::Ollama => Arc::new(OllamaGateway::new(config.clone())?),
        GenerationProvider::Openai => Arc::new(OpenAiGateway::new(config.clone())?),
    })
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

fn transport_error(e: reqwest::Error, timeout_secs: u64) -> AppError {
    if e.is_timeout() {
        AppError::GenerationTimeout { timeout_secs }
    } else {
        AppError::GenerationUnavailable {
            message: format!("Generation request failed: {}", e),
        }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response, timeout_secs: u64) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::GenerationUnavailable {
            message: format!("Generation API error {}: {}", status, body),
        });
    }

    response.json().await.map_err(|e| transport_error(e, timeout_secs))
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(AppError::GenerationUnavailable {
            message: "Generation service returned an empty response".to_string(),
        });
    }
    Ok(text)
}

// ----------------------------------------------------------------------------
// Ollama
// ----------------------------------------------------------------------------

/// Ollama client
pub struct OllamaGateway {
    client: reqwest::Client,
    config: GenerationConfig,
    url: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGateway {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = http_client(&config)?;
        let url = format!("{}/api/generate", config.endpoint.trim_end_matches('/'));
        Ok(Self { client, config, url })
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.config.model,
            prompt: &prompt.text,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.max_tokens,
                num_ctx: self.config.context_window,
            },
        }
    }
}

#[async_trait]
impl GenerationGateway for OllamaGateway {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let parsed: OllamaResponse = read_json(response, self.config.timeout_secs).await?;
        non_empty(parsed.response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

// ----------------------------------------------------------------------------
// OpenAI-compatible
// ----------------------------------------------------------------------------

/// OpenAI-compatible chat-completions client
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl OpenAiGateway {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl GenerationGateway for OpenAiGateway {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout_secs))?;

        let parsed: ChatResponse = read_json(response, self.config.timeout_secs).await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        non_empty(text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::assembler::fingerprint;

    fn prompt(text: &str) -> Prompt {
        Prompt {
            text: text.to_string(),
            template_version: "trip-plan/v1".to_string(),
            fingerprint: fingerprint(text),
        }
    }

    #[test]
    fn test_ollama_request_shape() {
        let gateway = OllamaGateway::new(GenerationConfig::default()).unwrap();
        let p = prompt("Plan a trip");
        let body = serde_json::to_value(gateway.request(&p)).unwrap();

        assert_eq!(gateway.url, "http://localhost:11434/api/generate");
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["prompt"], "Plan a trip");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1024);
        assert_eq!(body["options"]["num_ctx"], 4096);
    }

    #[test]
    fn test_parse_responses() {
        let ollama: OllamaResponse =
            serde_json::from_str(r#"{"model":"llama3.1","response":"Day 1: ...","done":true}"#).unwrap();
        assert_eq!(ollama.response, "Day 1: ...");

        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"Day 1"}}]}"#).unwrap();
        assert_eq!(chat.choices[0].message.content, "Day 1");

        assert!(non_empty("  ".to_string()).is_err());
    }

    #[test]
    fn test_factory_selects_provider() {
        let config = GenerationConfig {
            provider: GenerationProvider::Openai,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: Some("sk-test".to_string()),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        };
        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.model(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let config = GenerationConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let gateway = OllamaGateway::new(config).unwrap();
        let err = gateway.generate(&prompt("Plan a trip")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::GenerationUnavailable { .. } | AppError::GenerationTimeout { .. }
        ));
    }
}
