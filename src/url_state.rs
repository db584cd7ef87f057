use std::collections::HashMap;

use crate::filter::UrlFilters;
use crate::model::{FlightFilters, SearchParams, SearchStatus, StopsFilter};
use crate::query::validate_price;

/// What a shared URL asks for on page load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hydration {
    pub search: Option<SearchParams>,
    pub filters: UrlFilters,
}

fn query_part(input: &str) -> &str {
    let input = input.split('#').next().unwrap_or_default();
    match input.split_once('?') {
        Some((_, query)) => query,
        None => input,
    }
}

fn parse_pairs(query: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query_part(query).as_bytes()) {
        pairs.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    pairs
}

fn parse_price(value: Option<&String>) -> Option<f64> {
    let price: f64 = value?.trim().parse().ok()?;
    validate_price(price).is_ok().then_some(price)
}

/// Comma-separated airline names, trimmed, empties dropped, first occurrence
/// kept.
pub fn parse_airlines(value: Option<&str>) -> Vec<String> {
    let mut airlines: Vec<String> = Vec::new();
    for airline in value.map(|v| v.split(',')).into_iter().flatten() {
        let airline = airline.trim();
        if !airline.is_empty() && !airlines.iter().any(|a| a == airline) {
            airlines.push(airline.to_string());
        }
    }
    airlines
}

/// Reads search and filter state from a query string (or a full URL).
/// Partial or malformed values degrade to "no search" or to the default
/// filter value; they never fail.
pub fn parse_query(query: &str) -> Hydration {
    let pairs = parse_pairs(query);

    let search = match (
        pairs.get("origin"),
        pairs.get("destination"),
        pairs.get("date"),
    ) {
        (Some(origin), Some(destination), Some(date)) => {
            match SearchParams::from_input(origin, destination, date) {
                Ok(params) => Some(params),
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring invalid search in URL");
                    None
                }
            }
        }
        _ => None,
    };

    let stops = pairs
        .get("stops")
        .and_then(|s| StopsFilter::from_str_loose(s))
        .filter(|s| *s != StopsFilter::Any);

    Hydration {
        search,
        filters: UrlFilters {
            stops,
            airlines: parse_airlines(pairs.get("airlines").map(String::as_str)),
            min_price: parse_price(pairs.get("minPrice")),
            max_price: parse_price(pairs.get("maxPrice")),
        },
    }
}

/// Serializes committed search and filter state. Default-valued `stops` and
/// `airlines` are omitted; the price range is always written.
pub fn to_query(search: &SearchParams, filters: &FlightFilters) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("origin", &search.origin)
        .append_pair("destination", &search.destination)
        .append_pair("date", &search.date);

    if let Some(stops) = filters.stops.as_param() {
        query.append_pair("stops", stops);
    }

    if !filters.airlines.is_empty() {
        query.append_pair("airlines", &filters.airlines.join(","));
    }

    query
        .append_pair("minPrice", &filters.price_range.min.to_string())
        .append_pair("maxPrice", &filters.price_range.max.to_string());

    format!("?{}", query.finish())
}

/// Query for a search that has not run yet: only the filter values the
/// caller actually chose are written.
pub fn initial_query(search: &SearchParams, filters: &UrlFilters) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("origin", &search.origin)
        .append_pair("destination", &search.destination)
        .append_pair("date", &search.date);

    if let Some(stops) = filters.stops.and_then(|s| s.as_param()) {
        query.append_pair("stops", stops);
    }
    if !filters.airlines.is_empty() {
        query.append_pair("airlines", &filters.airlines.join(","));
    }
    if let Some(min) = filters.min_price {
        query.append_pair("minPrice", &min.to_string());
    }
    if let Some(max) = filters.max_price {
        query.append_pair("maxPrice", &max.to_string());
    }

    format!("?{}", query.finish())
}

/// Bridge between in-memory state and the address bar. Holds nothing but the
/// hydration latch.
#[derive(Debug, Default)]
pub struct UrlSync {
    hydrated: bool,
}

impl UrlSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// First call parses `query`; every later call returns `None`, so the
    /// synchronizer's own writes never trigger another search.
    pub fn hydrate(&mut self, query: &str) -> Option<Hydration> {
        if self.hydrated {
            return None;
        }
        self.hydrated = true;
        Some(parse_query(query))
    }

    pub fn reflect(
        &self,
        status: SearchStatus,
        last_search: Option<&SearchParams>,
        filters: &FlightFilters,
    ) -> Option<String> {
        if status != SearchStatus::Success {
            return None;
        }
        last_search.map(|search| to_query(search, filters))
    }
}

/// Address bar of a single page. `replace` swaps the query in place: no
/// history entry, no navigation.
#[derive(Debug, Clone)]
pub struct Location {
    query: String,
    history_len: usize,
}

impl Location {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            history_len: 1,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn replace(&mut self, query: String) {
        if self.query != query {
            tracing::trace!(%query, "replacing location");
            self.query = query;
        }
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }
}
