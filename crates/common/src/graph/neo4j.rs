//! Neo4j knowledge graph over the HTTP transactional endpoint
//!
//! Schema (as imported from the TravelPlanner dataset):
//! `(:TripPlan {org, dest, days, budget, people_number})-[:HAS_DAY_PLAN]->(:DayPlan)`
//! with `HAS_TRANSPORTATION`, `HAS_ACCOMMODATION`, `HAS_MEAL` and
//! `HAS_ATTRACTION` edges to nodes carrying a free-text `value`.

use super::{KnowledgeGraph, PrecedentFilter};
use crate::config::GraphConfig;
use crate::errors::{AppError, Result};
use crate::models::{CostCategory, CostKind, PrecedentTrip};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// Candidate query. The requested destination (`$destinations[0]`) sorts
/// before nearby destinations, which sort before origin-only hits; then
/// closeness to the requested budget and duration decides, so `LIMIT`
/// keeps the most useful rows.
const PRECEDENT_QUERY: &str = "\
MATCH (t:TripPlan)
WHERE toLower(t.dest) IN $destinations
   OR ($origin IS NOT NULL AND toLower(t.org) = $origin)
WITH t,
     CASE
       WHEN toLower(t.dest) = $destinations[0] THEN 0
       WHEN toLower(t.dest) IN $destinations THEN 1
       ELSE 2
     END AS tier,
     CASE WHEN $budget IS NULL THEN 0 ELSE abs(toFloat(t.budget) - $budget) END AS budget_gap,
     CASE WHEN $days IS NULL THEN 0 ELSE abs(toInteger(t.days) - $days) END AS days_gap
ORDER BY tier, budget_gap, days_gap, id(t)
LIMIT $limit
OPTIONAL MATCH (t)-[:HAS_DAY_PLAN]->(d:DayPlan)
OPTIONAL MATCH (d)-[:HAS_TRANSPORTATION]->(tr:Transportation)
OPTIONAL MATCH (d)-[:HAS_ACCOMMODATION]->(ac:Accommodation)
OPTIONAL MATCH (d)-[:HAS_MEAL]->(ml:Meal)
OPTIONAL MATCH (d)-[:HAS_ATTRACTION]->(at:Attraction)
WITH t, tier, budget_gap, days_gap,
     collect(DISTINCT tr) AS trs, collect(DISTINCT ac) AS acs,
     collect(DISTINCT ml) AS mls, collect(DISTINCT at) AS ats
RETURN id(t), t.org, t.dest, t.days, t.budget, t.people_number,
       [x IN trs | x.value],
       [x IN acs | x.value],
       [x IN mls | coalesce(x.meal_type + ': ', '') + x.value],
       [x IN ats | x.value]
ORDER BY tier, budget_gap, days_gap, id(t)";

/// Neo4j client
pub struct Neo4jGraph {
    client: reqwest::Client,
    commit_url: String,
    user: String,
    password: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jGraph {
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            commit_url: format!(
                "{}/db/{}/tx/commit",
                config.uri.trim_end_matches('/'),
                config.database
            ),
            user: config.user.clone(),
            password: config.password.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    async fn run(&self, statement: &str, parameters: Value) -> Result<TxResponse> {
        let request = TxRequest {
            statements: vec![Statement { statement, parameters }],
        };

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GraphUnavailable {
                message: format!("Neo4j HTTP error {}: {}", status, body),
            });
        }

        let parsed: TxResponse = response.json().await.map_err(|e| self.transport_error(e))?;

        if let Some(error) = parsed.errors.first() {
            return Err(AppError::GraphUnavailable {
                message: format!("{}: {}", error.code, error.message),
            });
        }

        Ok(parsed)
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::GraphTimeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            AppError::GraphUnavailable {
                message: format!("Neo4j request failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl KnowledgeGraph for Neo4jGraph {
    async fn find_precedents(&self, filter: &PrecedentFilter) -> Result<Vec<PrecedentTrip>> {
        if filter.is_unbounded() || filter.limit == 0 {
            return Ok(Vec::new());
        }

        let parameters = json!({
            "destinations": filter.destination_keys(),
            "origin": filter.origin_key(),
            "budget": filter.budget,
            "days": filter.duration_days,
            "limit": filter.limit,
        });

        let response = self.run(PRECEDENT_QUERY, parameters).await?;
        let mut trips = parse_precedents(response);
        trips.truncate(filter.limit);
        Ok(trips)
    }

    async fn ping(&self) -> Result<()> {
        self.run("RETURN 1", json!({})).await.map(|_| ())
    }

    fn backend(&self) -> &str {
        "neo4j"
    }
}

/// Convert result rows to precedents, skipping malformed rows
fn parse_precedents(response: TxResponse) -> Vec<PrecedentTrip> {
    response
        .results
        .into_iter()
        .flat_map(|r| r.data)
        .filter_map(|r| {
            let trip = parse_row(&r.row);
            if trip.is_none() {
                debug!(row = ?r.row, "Skipping malformed TripPlan row");
            }
            trip
        })
        .collect()
}

fn parse_row(row: &[Value]) -> Option<PrecedentTrip> {
    let [id, org, dest, days, budget, people, transport, stay, food, attractions] = row else {
        return None;
    };

    let trip = PrecedentTrip {
        id: id.as_i64()?,
        origin: org.as_str()?.to_string(),
        destination: dest.as_str()?.to_string(),
        duration_days: as_u32(days)?,
        budget: as_f64(budget)?,
        people: as_u32(people),
        cost_breakdown: vec![
            cost_category(CostKind::Transport, transport),
            cost_category(CostKind::Stay, stay),
            cost_category(CostKind::Food, food),
            cost_category(CostKind::Attractions, attractions),
        ],
    };
    Some(trip.normalized())
}

fn cost_category(kind: CostKind, values: &Value) -> CostCategory {
    let items: Vec<String> = values
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != "-")
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let costs: Vec<f64> = items.iter().filter_map(|item| item_cost(item)).collect();
    let estimated_cost = (!costs.is_empty()).then(|| costs.iter().sum());

    CostCategory {
        category: kind,
        items,
        estimated_cost,
    }
}

/// Price embedded in a plan entry, e.g. "Taxi, from A to B, cost: 45"
fn item_cost(item: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:cost|price)\s*:?\s*\$?\s*(\d+(?:\.\d+)?)")
            .expect("cost pattern is valid")
    });
    re.captures(item)?.get(1)?.as_str().parse().ok()
}

// The dataset stores numbers as ints, floats or numeric strings
fn as_f64(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0)
}

fn as_u32(value: &Value) -> Option<u32> {
    as_f64(value).and_then(|v| u32::try_from(v.round() as i64).ok())
}
