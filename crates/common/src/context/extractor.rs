//! Trip Extractor - Turns free-text queries into trip parameters
//!
//! Provides:
//! - Origin/destination resolution from location entities and cue words
//! - Duration from day/night/week phrases or date ranges
//! - Budget from currency-marked amounts
//! - Traveller count and keyword constraints
//!
//! Extraction never fails. Anything that cannot be read with confidence
//! is left absent.

use crate::config::ExtractionConfig;
use crate::entities::{
    money_spans, parse_money, Entity, EntityLabel, EntityRecognizer, GazetteerRecognizer,
    HttpEntityRecognizer,
};
use crate::errors::Result;
use crate::metrics;
use crate::models::TripParameters;
use chrono::NaiveDate;
use regex_lite::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, warn};

/// Keyword constraints, in the order they are reported
const CONSTRAINT_TABLE: &[(&[&str], &str)] = &[
    (&["vegetarian"], "vegetarian"),
    (&["vegan"], "vegan"),
    (&["pet-friendly", "pet friendly", "with pets", "with my dog", "with our dog"], "pet-friendly"),
    (&["wheelchair"], "wheelchair accessible"),
    (&["with kids", "with children", "with my kids", "with our kids", "family trip"], "family-friendly"),
    (&["no flights", "no flight", "no flying", "without flying"], "no flights"),
    (&["no self-driving", "no driving", "without a car"], "no self-driving"),
    (&["non-smoking", "no smoking"], "non-smoking"),
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5),
    ("six", 6), ("seven", 7), ("eight", 8), ("nine", 9), ("ten", 10), ("eleven", 11),
    ("twelve", 12), ("thirteen", 13), ("fourteen", 14),
];

/// What the word in front of a location says about it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cue {
    Origin,
    Destination,
    None,
}

#[derive(Debug)]
struct Located {
    name: String,
    cue: Cue,
}

/// Extractor for trip parameters
pub struct TripExtractor {
    /// External recognizer; `None` means the gazetteer is the only one
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    fallback: GazetteerRecognizer,
    max_locations: usize,
    max_duration_days: u32,
}

impl TripExtractor {
    /// Build from configuration, wiring the HTTP recognizer when an
    /// endpoint is configured
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let recognizer: Option<Arc<dyn EntityRecognizer>> = match &config.ner_endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => Some(Arc::new(HttpEntityRecognizer::new(
                endpoint.clone(),
                Duration::from_millis(config.ner_timeout_ms),
            )?)),
            _ => None,
        };

        Ok(Self {
            recognizer,
            fallback: GazetteerRecognizer::new(),
            max_locations: config.max_locations,
            max_duration_days: config.max_duration_days,
        })
    }

    /// Use a specific recognizer in front of the gazetteer
    pub fn with_recognizer(recognizer: Arc<dyn EntityRecognizer>, config: &ExtractionConfig) -> Self {
        Self {
            recognizer: Some(recognizer),
            fallback: GazetteerRecognizer::new(),
            max_locations: config.max_locations,
            max_duration_days: config.max_duration_days,
        }
    }

    /// Extract trip parameters from a query
    pub async fn extract(&self, text: &str) -> TripParameters {
        let (entities, used_fallback) = self.recognize(text).await;

        let (origin, destination) = self.resolve_locations(text, &entities);
        let duration_days = self.parse_duration(text);
        let budget = parse_budget(text, &entities);
        let constraints = parse_constraints(text);

        let params = TripParameters::new(origin, destination, duration_days, budget, constraints);

        debug!(
            fields = ?params.present_fields(),
            entities = entities.len(),
            used_fallback,
            "Extracted trip parameters"
        );
        metrics::record_extraction(&params.present_fields(), used_fallback);

        params
    }

    async fn recognize(&self, text: &str) -> (Vec<Entity>, bool) {
        let mut used_fallback = false;

        if let Some(recognizer) = &self.recognizer {
            match recognizer.recognize(text).await {
                Ok(entities) => return (entities, false),
                Err(e) => {
                    warn!(
                        recognizer = recognizer.name(),
                        error = %e,
                        "Entity recognizer failed, falling back to gazetteer"
                    );
                    used_fallback = true;
                }
            }
        }

        let entities = self.fallback.recognize(text).await.unwrap_or_default();
        (entities, used_fallback)
    }

    fn resolve_locations(&self, text: &str, entities: &[Entity]) -> (Option<String>, Option<String>) {
        let mut locations: Vec<Located> = Vec::new();
        for entity in entities.iter().filter(|e| e.label == EntityLabel::Location) {
            let name = entity.text.trim();
            if name.is_empty() || locations.iter().any(|l| l.name.eq_ignore_ascii_case(name)) {
                continue;
            }
            locations.push(Located {
                name: name.to_string(),
                cue: cue_before(text, entity.start),
            });
        }

        match locations.len() {
            0 => (None, None),
            n if n > self.max_locations => {
                debug!(locations = n, "Too many locations to disambiguate");
                (None, None)
            }
            1 => (None, Some(locations.remove(0).name)),
            n => {
                let origin = locations.iter().position(|l| l.cue == Cue::Origin);
                let destination = locations
                    .iter()
                    .enumerate()
                    .position(|(i, l)| l.cue == Cue::Destination && Some(i) != origin);
                let origin = origin.or_else(|| (0..n).find(|i| Some(*i) != destination));
                let destination = destination.or_else(|| (0..n).find(|i| Some(*i) != origin));

                (
                    origin.map(|i| locations[i].name.clone()),
                    destination.map(|i| locations[i].name.clone()),
                )
            }
        }
    }

    /// Counted length phrases, then date ranges, then "a week" style
    /// phrases, then "weekend"
    fn parse_duration(&self, text: &str) -> Option<u32> {
        let phrases = length_phrases(text);
        let counted = phrases.iter().find(|p| !p.article).map(|p| p.days);
        let article = phrases.iter().find(|p| p.article).map(|p| p.days);

        counted
            .or_else(|| parse_date_range(text))
            .or(article)
            .or_else(|| text.to_ascii_lowercase().contains("weekend").then_some(2))
            .filter(|d| *d >= 1 && *d <= self.max_duration_days)
    }
}

fn cue_before(text: &str, start: usize) -> Cue {
    let before = text.get(..start).unwrap_or_default();
    let word = before
        .split_whitespace()
        .next_back()
        .unwrap_or_default()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();

    match word.as_str() {
        "from" | "leaving" => Cue::Origin,
        "to" | "in" | "visit" | "visiting" | "into" => Cue::Destination,
        _ => Cue::None,
    }
}

/// A trip length phrase such as "3 days", "two weeks" or "a week"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LengthPhrase {
    days: u32,
    /// Counted by "a"/"an" rather than a number
    article: bool,
}

/// Every length phrase in `text`, left to right. Article phrases right
/// after an amount ("$100 a day") are rates, not lengths, and are skipped.
fn length_phrases(text: &str) -> Vec<LengthPhrase> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,3}|an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen)\s*-?\s*(days?|nights?|weeks?)\b",
        )
        .expect("length pattern is valid")
    });

    re.captures_iter(text)
        .filter_map(|caps| {
            let count_match = caps.get(1)?;
            let token = count_match.as_str().to_ascii_lowercase();
            let article = token == "a" || token == "an";
            let count = if article {
                if follows_amount(text, count_match.start()) {
                    return None;
                }
                1
            } else {
                number_value(&token)?
            };

            let unit = caps.get(2)?.as_str().to_ascii_lowercase();
            let days = if unit.starts_with("night") {
                count + 1
            } else if unit.starts_with("week") {
                count * 7
            } else {
                count
            };
            Some(LengthPhrase { days, article })
        })
        .collect()
}

fn follows_amount(text: &str, start: usize) -> bool {
    text.get(..start)
        .and_then(|before| before.split_whitespace().next_back())
        .is_some_and(|word| word.contains('$') || word.chars().any(|c| c.is_ascii_digit()))
}

fn number_value(token: &str) -> Option<u32> {
    token.parse().ok().or_else(|| {
        let token = token.to_ascii_lowercase();
        NUMBER_WORDS.iter().find(|(w, _)| *w == token).map(|(_, n)| *n)
    })
}

/// Inclusive day count of the first date range in `text`
fn parse_date_range(text: &str) -> Option<u32> {
    static ISO: OnceLock<Regex> = OnceLock::new();
    static MONTH_DAY: OnceLock<Regex> = OnceLock::new();
    static DAY_MONTH: OnceLock<Regex> = OnceLock::new();

    let iso = ISO.get_or_init(|| {
        Regex::new(r"\b(\d{4}-\d{2}-\d{2})\s*(?:to|until|through|-|–)\s*(\d{4}-\d{2}-\d{2})\b")
            .expect("iso range pattern is valid")
    });
    if let Some(caps) = iso.captures(text) {
        let start = NaiveDate::parse_from_str(caps.get(1)?.as_str(), "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(caps.get(2)?.as_str(), "%Y-%m-%d").ok()?;
        return inclusive_days(start, end);
    }

    const MONTH: &str = r"(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?";
    const DAY: &str = r"(\d{1,2})(?:st|nd|rd|th)?";
    const SEP: &str = r"\s*(?:to|until|through|till|-|–)\s*";

    // "March 3 to March 7", "March 3-7"
    let month_day = MONTH_DAY.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b{MONTH}\s+{DAY}{SEP}(?:{MONTH}\s+)?{DAY}\b"))
            .expect("month-day range pattern is valid")
    });
    if let Some(caps) = month_day.captures(text) {
        let start_month = month_number(caps.get(1)?.as_str())?;
        let start_day = caps.get(2)?.as_str().parse().ok()?;
        let end_month = match caps.get(3) {
            Some(m) => month_number(m.as_str())?,
            None => start_month,
        };
        let end_day = caps.get(4)?.as_str().parse().ok()?;
        return calendar_days(start_month, start_day, end_month, end_day);
    }

    // "3 March until 7 March", "3rd to 7th March"
    let day_month = DAY_MONTH.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b{DAY}(?:\s+{MONTH})?{SEP}{DAY}\s+{MONTH}"))
            .expect("day-month range pattern is valid")
    });
    if let Some(caps) = day_month.captures(text) {
        let start_day = caps.get(1)?.as_str().parse().ok()?;
        let end_month = month_number(caps.get(4)?.as_str())?;
        let start_month = match caps.get(2) {
            Some(m) => month_number(m.as_str())?,
            None => end_month,
        };
        let end_day = caps.get(3)?.as_str().parse().ok()?;
        return calendar_days(start_month, start_day, end_month, end_day);
    }

    None
}

/// Month/day pairs without a year. A range ending before it starts
/// runs into the next year.
fn calendar_days(start_month: u32, start_day: u32, end_month: u32, end_day: u32) -> Option<u32> {
    // Leap reference year so 29 February parses
    const YEAR: i32 = 2024;
    let start = NaiveDate::from_ymd_opt(YEAR, start_month, start_day)?;
    let mut end = NaiveDate::from_ymd_opt(YEAR, end_month, end_day)?;
    if end < start {
        end = NaiveDate::from_ymd_opt(YEAR + 1, end_month, end_day)?;
    }
    inclusive_days(start, end)
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> Option<u32> {
    let days = (end - start).num_days() + 1;
    u32::try_from(days).ok().filter(|d| *d >= 1)
}

fn month_number(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix = token.get(..3)?.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}

/// First parseable currency amount; recognizer spans first, then local patterns
fn parse_budget(text: &str, entities: &[Entity]) -> Option<f64> {
    let recognized = entities
        .iter()
        .filter(|e| e.label == EntityLabel::Money)
        .find_map(|e| parse_money(&e.text));

    recognized.or_else(|| {
        let mut spans = money_spans(text);
        spans.sort_by_key(|e| e.start);
        spans.iter().find_map(|e| parse_money(&e.text))
    })
}

fn parse_constraints(text: &str) -> Vec<String> {
    static TRAVELERS: OnceLock<Regex> = OnceLock::new();
    let travelers = TRAVELERS.get_or_init(|| {
        Regex::new(
            r"(?i)\b(\d{1,2}|two|three|four|five|six|seven|eight|nine|ten)\s+(?:people|persons|travell?ers|adults|guests|friends)\b",
        )
        .expect("traveller pattern is valid")
    });

    let lower = text.to_ascii_lowercase();
    let mut constraints = Vec::new();

    let count = travelers
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| number_value(m.as_str()))
        .or_else(|| contains_phrase(&lower, "solo").then_some(1));
    if let Some(count) = count.filter(|c| *c >= 1) {
        constraints.push(format!("travelers: {}", count));
    }

    for (phrases, constraint) in CONSTRAINT_TABLE {
        if phrases.iter().any(|p| contains_phrase(&lower, p)) {
            constraints.push(constraint.to_string());
        }
    }

    constraints
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        before_ok && after_ok
    })
}
