use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime};

use crate::model::{
    Flight, FlightFilters, PriceBounds, PriceRange, SortKey, SortOrder, SortState, StopsFilter,
};

pub fn compute_bounds(flights: &[Flight]) -> PriceBounds {
    let mut prices = flights.iter().map(|f| f.price);
    let Some(first) = prices.next() else {
        return PriceBounds::default();
    };

    prices.fold(PriceBounds { min: first, max: first }, |bounds, price| PriceBounds {
        min: bounds.min.min(price),
        max: bounds.max.max(price),
    })
}

fn matches_stops(stops: StopsFilter, flight_stops: u32) -> bool {
    match stops {
        StopsFilter::Any => true,
        StopsFilter::Nonstop => flight_stops == 0,
        StopsFilter::OneStop => flight_stops == 1,
        StopsFilter::TwoPlus => flight_stops >= 2,
    }
}

pub fn matches(flight: &Flight, filters: &FlightFilters) -> bool {
    if !matches_stops(filters.stops, flight.stops) {
        return false;
    }

    if flight.price < filters.price_range.min || flight.price > filters.price_range.max {
        return false;
    }

    filters.airlines.is_empty() || filters.airlines.iter().any(|a| *a == flight.airline)
}

pub fn apply_filters<'a>(flights: &'a [Flight], filters: &FlightFilters) -> Vec<&'a Flight> {
    flights.iter().filter(|f| matches(f, filters)).collect()
}

/// Digits immediately before the first `unit` marker, e.g. `30` for `'M'` in
/// `PT2H30M`.
fn duration_component(duration: &str, unit: char) -> u64 {
    let mut digits = String::new();
    for c in duration.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c == unit && !digits.is_empty() {
            return digits.parse().unwrap_or(0);
        } else {
            digits.clear();
        }
    }
    0
}

/// Total minutes of an ISO-8601 duration such as `PT2H30M`. Only the hour and
/// minute components count; anything unparsable is 0.
pub fn duration_minutes(duration: &str) -> u64 {
    duration_component(duration, 'H')
        .saturating_mul(60)
        .saturating_add(duration_component(duration, 'M'))
}

/// Departure instant in epoch milliseconds. Timestamps without an offset are
/// read as UTC; unparsable ones are 0.
pub fn departure_epoch(timestamp: &str) -> i64 {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return dt.timestamp_millis();
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

fn compare(a: &Flight, b: &Flight, key: SortKey) -> Ordering {
    match key {
        SortKey::Price => a.price.total_cmp(&b.price),
        SortKey::Duration => duration_minutes(&a.duration).cmp(&duration_minutes(&b.duration)),
        SortKey::Departure => {
            departure_epoch(&a.departure_time).cmp(&departure_epoch(&b.departure_time))
        }
        SortKey::Airline => a.airline.cmp(&b.airline),
    }
}

/// Stable sort; `Desc` flips the comparison so equal keys keep their order.
pub fn apply_sort<'a>(flights: &[&'a Flight], sort: SortState) -> Vec<&'a Flight> {
    let mut sorted = flights.to_vec();
    sorted.sort_by(|a, b| {
        let ord = compare(a, b, sort.key);
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    sorted
}

/// Filter values read from a shared URL, applied once the matching result
/// set arrives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UrlFilters {
    pub stops: Option<StopsFilter>,
    pub airlines: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl UrlFilters {
    pub fn is_empty(&self) -> bool {
        self.stops.is_none()
            && self.airlines.is_empty()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }
}

fn clamp_range(range: PriceRange, bounds: PriceBounds) -> PriceRange {
    PriceRange {
        min: range.min.clamp(bounds.min, bounds.max),
        max: range.max.clamp(bounds.min, bounds.max),
    }
}

/// User-adjustable view over the current result set. Recomputation is driven
/// explicitly through [`FilterEngine::sync`].
#[derive(Debug, Default)]
pub struct FilterEngine {
    filters: FlightFilters,
    sort: SortState,
    bounds: PriceBounds,
    generation: Option<u64>,
    reset_for: Option<(String, u64)>,
    seeded: bool,
    staged: Option<(String, UrlFilters)>,
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FlightFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn price_bounds(&self) -> PriceBounds {
        self.bounds
    }

    /// Recomputes derived state after the flight set or search key changed.
    ///
    /// Order: bounds (when `generation` moved), then a reset once per
    /// distinct completed search, otherwise clamping of the active price
    /// range into the new bounds.
    pub fn sync(&mut self, flights: &[Flight], generation: u64, search_key: Option<&str>) {
        let mut bounds_changed = false;
        if self.generation != Some(generation) {
            let bounds = compute_bounds(flights);
            bounds_changed = bounds != self.bounds;
            self.bounds = bounds;
            self.generation = Some(generation);
        }

        if let Some(key) = search_key {
            let fresh = self
                .reset_for
                .as_ref()
                .is_none_or(|(k, g)| k != key || *g != generation);
            if fresh && !flights.is_empty() {
                tracing::debug!(key, generation, "new result set, resetting filters");
                self.reset_for = Some((key.to_string(), generation));
                self.reset_filters();
                self.sort = SortState::default();
                self.seeded = true;
                match self.staged.take() {
                    Some((staged_key, staged)) if staged_key == key => {
                        self.apply_url_filters(staged);
                    }
                    Some((staged_key, _)) => {
                        tracing::debug!(%staged_key, key, "dropping URL filters for another search");
                    }
                    None => {}
                }
                return;
            }
        }

        if bounds_changed && self.seeded {
            self.filters.price_range = clamp_range(self.filters.price_range, self.bounds);
        }
    }

    pub fn set_stops(&mut self, stops: StopsFilter) {
        self.filters.stops = stops;
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.filters.price_range = PriceRange { min, max };
    }

    pub fn toggle_airline(&mut self, airline: &str) {
        if let Some(pos) = self.filters.airlines.iter().position(|a| a == airline) {
            self.filters.airlines.remove(pos);
        } else {
            self.filters.airlines.push(airline.to_string());
        }
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    pub fn reset_filters(&mut self) {
        self.filters = FlightFilters::defaults(self.bounds);
    }

    /// Holds URL filter values until the reset for `search_key`, which would
    /// otherwise overwrite them. A reset for any other search drops them.
    pub fn stage_url_filters(&mut self, search_key: &str, filters: UrlFilters) {
        self.staged = (!filters.is_empty()).then(|| (search_key.to_string(), filters));
    }

    pub fn clear_staged_filters(&mut self) {
        self.staged = None;
    }

    pub fn has_staged_filters(&self) -> bool {
        self.staged.is_some()
    }

    fn apply_url_filters(&mut self, staged: UrlFilters) {
        if let Some(stops) = staged.stops {
            self.filters.stops = stops;
        }
        for airline in staged.airlines {
            if !self.filters.airlines.contains(&airline) {
                self.filters.airlines.push(airline);
            }
        }
        let range = PriceRange {
            min: staged.min_price.unwrap_or(self.bounds.min),
            max: staged.max_price.unwrap_or(self.bounds.max),
        };
        let range = clamp_range(range, self.bounds);
        self.set_price_range(range.min, range.max);
    }

    pub fn filtered_flights<'a>(&self, flights: &'a [Flight]) -> Vec<&'a Flight> {
        apply_filters(flights, &self.filters)
    }

    pub fn sorted_flights<'a>(&self, flights: &'a [Flight]) -> Vec<&'a Flight> {
        apply_sort(&self.filtered_flights(flights), self.sort)
    }

    /// Distinct airlines in first-seen order.
    pub fn available_airlines(flights: &[Flight]) -> Vec<String> {
        let mut airlines: Vec<String> = Vec::new();
        for flight in flights {
            if !airlines.contains(&flight.airline) {
                airlines.push(flight.airline.clone());
            }
        }
        airlines
    }
}
