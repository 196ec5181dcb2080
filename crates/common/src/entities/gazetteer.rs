//! Known-city gazetteer
//!
//! Single policy table used for location recognition, trip-type
//! classification, and nearby-city fallback during retrieval.
//! Extend the table to add cities; no other code needs to change.

use serde::Serialize;

/// Physical character of a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Geography {
    Coastal,
    Mountain,
    Urban,
}

/// One gazetteer entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KnownCity {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub region: &'static str,
    pub geography: Geography,
}

use Geography::*;

const fn city(
    name: &'static str,
    aliases: &'static [&'static str],
    region: &'static str,
    geography: Geography,
) -> KnownCity {
    KnownCity { name, aliases, region, geography }
}

/// The table. Order matters only for nearby-city listing.
pub static KNOWN_CITIES: &[KnownCity] = &[
    // US northeast
    city("New York", &["new york city", "nyc", "manhattan", "brooklyn"], "us-northeast", Urban),
    city("Boston", &[], "us-northeast", Urban),
    city("Philadelphia", &["philly"], "us-northeast", Urban),
    city("Washington", &["washington dc", "washington d.c.", "dc"], "us-northeast", Urban),
    city("Baltimore", &[], "us-northeast", Urban),
    city("Pittsburgh", &[], "us-northeast", Urban),
    city("Portland, Maine", &["portland me"], "us-northeast", Coastal),
    // US midwest
    city("Chicago", &[], "us-midwest", Urban),
    city("Kansas City", &[], "us-midwest", Urban),
    city("St. Louis", &["st louis", "saint louis"], "us-midwest", Urban),
    city("Rockford", &[], "us-midwest", Urban),
    city("Minneapolis", &[], "us-midwest", Urban),
    city("Milwaukee", &[], "us-midwest", Urban),
    city("Detroit", &[], "us-midwest", Urban),
    city("Indianapolis", &[], "us-midwest", Urban),
    city("Columbus", &[], "us-midwest", Urban),
    city("Omaha", &[], "us-midwest", Urban),
    // US southeast
    city("Miami", &[], "us-southeast", Coastal),
    city("Orlando", &[], "us-southeast", Urban),
    city("Tampa", &[], "us-southeast", Coastal),
    city("Sarasota", &[], "us-southeast", Coastal),
    city("Key West", &[], "us-southeast", Coastal),
    city("Myrtle Beach", &[], "us-southeast", Coastal),
    city("Charleston", &[], "us-southeast", Coastal),
    city("Savannah", &[], "us-southeast", Coastal),
    city("Atlanta", &[], "us-southeast", Urban),
    city("Nashville", &[], "us-southeast", Urban),
    city("New Orleans", &["nola"], "us-southeast", Urban),
    city("Asheville", &[], "us-southeast", Mountain),
    // US south / southwest
    city("Houston", &[], "us-southwest", Urban),
    city("Dallas", &[], "us-southwest", Urban),
    city("Austin", &[], "us-southwest", Urban),
    city("San Antonio", &[], "us-southwest", Urban),
    city("Phoenix", &[], "us-southwest", Urban),
    city("Las Vegas", &["vegas"], "us-southwest", Urban),
    city("Sedona", &[], "us-southwest", Mountain),
    city("Santa Fe", &[], "us-southwest", Mountain),
    // US mountain west
    city("Denver", &[], "us-mountain", Mountain),
    city("Aspen", &[], "us-mountain", Mountain),
    city("Boulder", &[], "us-mountain", Mountain),
    city("Salt Lake City", &["slc"], "us-mountain", Mountain),
    city("Jackson Hole", &[], "us-mountain", Mountain),
    city("Bozeman", &[], "us-mountain", Mountain),
    // US west coast
    city("Los Angeles", &["la"], "us-west", Urban),
    city("San Diego", &[], "us-west", Coastal),
    city("San Francisco", &["sf"], "us-west", Urban),
    city("Santa Barbara", &[], "us-west", Coastal),
    city("Lake Tahoe", &["tahoe"], "us-west", Mountain),
    city("Seattle", &[], "us-northwest", Urban),
    city("Portland", &["portland or"], "us-northwest", Urban),
    city("Honolulu", &["waikiki"], "us-hawaii", Coastal),
    city("Maui", &[], "us-hawaii", Coastal),
    // International
    city("Paris", &[], "europe-west", Urban),
    city("London", &[], "europe-west", Urban),
    city("Barcelona", &[], "europe-south", Coastal),
    city("Zermatt", &[], "europe-alps", Mountain),
    city("Interlaken", &[], "europe-alps", Mountain),
    city("Goa", &[], "india-west", Coastal),
    city("Mumbai", &["bombay"], "india-west", Urban),
    city("Manali", &[], "india-north", Mountain),
    city("Shimla", &[], "india-north", Mountain),
    city("Delhi", &["new delhi"], "india-north", Urban),
    city("Bali", &[], "asia-southeast", Coastal),
    city("Tokyo", &[], "asia-east", Urban),
];

/// Find a city by canonical name or alias (case-insensitive)
pub fn lookup(name: &str) -> Option<&'static KnownCity> {
    let needle = normalize(name);
    if needle.is_empty() {
        return None;
    }

    KNOWN_CITIES.iter().find(|c| {
        normalize(c.name) == needle || c.aliases.iter().any(|a| normalize(a) == needle)
    })
}

/// Other known cities in the same region, in table order
pub fn nearby(name: &str, max: usize) -> Vec<&'static str> {
    let Some(origin) = lookup(name) else {
        return Vec::new();
    };

    KNOWN_CITIES
        .iter()
        .filter(|c| c.region == origin.region && c.name != origin.name)
        .map(|c| c.name)
        .take(max)
        .collect()
}

/// A gazetteer hit inside a piece of text (byte offsets)
#[derive(Debug, Clone, PartialEq)]
pub struct CityMatch {
    pub city: &'static KnownCity,
    pub start: usize,
    pub end: usize,
}

/// Find every known city mentioned in `text`.
///
/// Matching is ASCII case-insensitive on word boundaries; overlapping
/// hits resolve to the longest one ("Kansas City" over "Kansas").
pub fn find_in_text(text: &str) -> Vec<CityMatch> {
    let haystack = text.to_ascii_lowercase();
    let mut hits: Vec<CityMatch> = Vec::new();

    for city in KNOWN_CITIES {
        for name in std::iter::once(&city.name).chain(city.aliases.iter()) {
            let needle = name.to_ascii_lowercase();
            for (start, _) in haystack.match_indices(&needle) {
                let end = start + needle.len();
                if is_boundary(&haystack, start, end) {
                    hits.push(CityMatch { city, start, end });
                }
            }
        }
    }

    hits.sort_by(|a, b| a.start.cmp(&b.start).then((b.end - b.start).cmp(&(a.end - a.start))));

    let mut selected: Vec<CityMatch> = Vec::new();
    for hit in hits {
        if selected.last().map_or(true, |prev| hit.start >= prev.end) {
            selected.push(hit);
        }
    }
    selected
}

fn is_boundary(haystack: &str, start: usize, end: usize) -> bool {
    let bytes = haystack.as_bytes();
    let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
    let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
    before_ok && after_ok
}

fn normalize(name: &str) -> String {
    name.trim()
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
