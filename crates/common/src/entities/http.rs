//! External NER service client
//!
//! Talks to a spaCy-style service: `POST {endpoint}` with `{"text": ...}`,
//! answered by `{"entities": [{"text", "label", "start", "end"}]}`.

use super::{gazetteer, Entity, EntityLabel, EntityRecognizer};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP entity recognizer
pub struct HttpEntityRecognizer {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct NerRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct NerResponse {
    #[serde(default)]
    entities: Vec<NerSpan>,
}

#[derive(Deserialize)]
struct NerSpan {
    text: String,
    label: String,
    start: usize,
    end: usize,
}

impl HttpEntityRecognizer {
    /// Create a new recognizer bound to `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EntityRecognizer for HttpEntityRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&NerRequest { text })
            .send()
            .await
            .map_err(|e| AppError::EntityRecognition {
                message: format!("NER request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EntityRecognition {
                message: format!("NER service error {}: {}", status, body),
            });
        }

        let parsed: NerResponse = response.json().await.map_err(|e| AppError::EntityRecognition {
            message: format!("Failed to parse NER response: {}", e),
        })?;

        Ok(map_spans(parsed.entities))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Map service labels onto ours; unknown labels are dropped.
/// Known cities are reported under their canonical gazetteer name.
fn map_spans(spans: Vec<NerSpan>) -> Vec<Entity> {
    let mut entities: Vec<Entity> = spans
        .into_iter()
        .filter_map(|span| {
            let label = match span.label.to_ascii_uppercase().as_str() {
                "GPE" | "LOC" | "FAC" | "LOCATION" => EntityLabel::Location,
                "MONEY" => EntityLabel::Money,
                "CARDINAL" | "QUANTITY" => EntityLabel::Number,
                "DATE" => EntityLabel::Date,
                _ => return None,
            };
            let text = match label {
                EntityLabel::Location => gazetteer::lookup(&span.text)
                    .map(|c| c.name.to_string())
                    .unwrap_or(span.text),
                _ => span.text,
            };
            Some(Entity {
                text,
                label,
                start: span.start,
                end: span.end,
            })
        })
        .collect();

    entities.sort_by_key(|e| (e.start, e.end));
    entities
}
