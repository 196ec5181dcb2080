//! Entity recognition abstraction
//!
//! Provides a unified interface for tagging spans of a travel query:
//! - Local gazetteer + pattern recognizer (always available)
//! - External NER service over HTTP (spaCy-style labels)

pub mod gazetteer;
mod http;

pub use http::HttpEntityRecognizer;

use crate::errors::Result;
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Trait for entity recognition
#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Tag entities in `text`, ordered by position
    async fn recognize(&self, text: &str) -> Result<Vec<Entity>>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Entity type tags the extractor understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityLabel {
    Location,
    Money,
    Number,
    Date,
}

/// A tagged span of the query text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Surface text, or the canonical city name for gazetteer hits
    pub text: String,
    pub label: EntityLabel,
    /// Byte offsets into the original query
    pub start: usize,
    pub end: usize,
}

/// Recognizer backed by the built-in gazetteer and currency patterns
#[derive(Debug, Default, Clone)]
pub struct GazetteerRecognizer;

impl GazetteerRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn locations(&self, text: &str) -> Vec<Entity> {
        let mut entities: Vec<Entity> = gazetteer::find_in_text(text)
            .into_iter()
            .map(|m| Entity {
                text: m.city.name.to_string(),
                label: EntityLabel::Location,
                start: m.start,
                end: m.end,
            })
            .collect();

        // Capitalized names after "from"/"to" that the table does not know
        for caps in cue_place_pattern().captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            let overlaps = entities
                .iter()
                .any(|e| name.start() < e.end && e.start < name.end());
            let first_word = name.as_str().split_whitespace().next().unwrap_or_default();
            if overlaps || is_non_place_word(first_word) {
                continue;
            }
            entities.push(Entity {
                text: name.as_str().to_string(),
                label: EntityLabel::Location,
                start: name.start(),
                end: name.end(),
            });
        }

        entities
    }

}

#[async_trait]
impl EntityRecognizer for GazetteerRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<Entity>> {
        let mut entities = self.locations(text);
        entities.extend(money_spans(text));
        entities.sort_by_key(|e| (e.start, e.end));
        entities.dedup_by(|a, b| a.label == b.label && a.start == b.start);
        Ok(entities)
    }

    fn name(&self) -> &str {
        "gazetteer"
    }
}

/// Currency-marked amounts in `text`, in pattern order
pub fn money_spans(text: &str) -> Vec<Entity> {
    money_patterns()
        .iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| Entity {
            text: m.as_str().to_string(),
            label: EntityLabel::Money,
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Parse the magnitude of a currency-marked amount.
///
/// Accepts `$1,500`, `$2.5k`, `1500 dollars`, `USD 900`, `budget of 1200`.
pub fn parse_money(text: &str) -> Option<f64> {
    let re = amount_pattern();
    let caps = re.captures(text)?;
    let digits: String = caps.get(1)?.as_str().chars().filter(|c| *c != ',').collect();
    let mut value: f64 = digits.parse().ok()?;
    if caps.get(2).is_some() {
        value *= 1000.0;
    }
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn amount_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)(?:\s*(k))?\b")
            .expect("amount pattern is valid")
    })
}

fn money_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            // $1,500 / $ 2.5k
            r"(?i)\$\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?(?:\s*k)?\b",
            // 1500 dollars / 1.2k usd / 800 bucks
            r"(?i)\b(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?\s*k?\s*(?:dollars|usd|bucks)\b",
            // USD 900
            r"(?i)\busd\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?(?:\s*k)?\b",
            // budget of 1200 / budget is $1200
            r"(?i)\bbudget\s+(?:of|is|around|about)\s+\$?\s*(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?(?:\s*k)?\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("money pattern is valid"))
        .collect()
    })
}

fn cue_place_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:[Ff]rom|[Tt]o|[Vv]isit|[Vv]isiting)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2})")
            .expect("cue place pattern is valid")
    })
}

fn is_non_place_word(word: &str) -> bool {
    const NON_PLACES: &[&str] = &[
        "I", "The", "A", "An", "My", "Our", "Me", "Us", "Plan", "Please", "Help",
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ];
    NON_PLACES.contains(&word)
}
