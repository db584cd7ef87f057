use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use skyfare::error::{FlightError, LOAD_FAILED_MESSAGE};
use skyfare::fetch::FlightProvider;
use skyfare::model::{
    Flight, PriceBounds, SearchParams, SearchStatus, SortKey, SortOrder, SortState, StopsFilter,
};
use skyfare::page::SearchPage;

/// Answers immediately with a fixed result per origin; unknown origins fail.
#[derive(Default)]
struct CannedProvider {
    results: Mutex<HashMap<String, Vec<Flight>>>,
    calls: AtomicUsize,
}

impl CannedProvider {
    fn with(origin: &str, flights: Vec<Flight>) -> Arc<Self> {
        let provider = Self::default();
        provider.add(origin, flights);
        Arc::new(provider)
    }

    fn add(&self, origin: &str, flights: Vec<Flight>) {
        self.results.lock().unwrap().insert(origin.to_string(), flights);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightProvider for CannedProvider {
    async fn search(
        &self,
        params: &SearchParams,
        _cancel: CancellationToken,
    ) -> Result<Vec<Flight>, FlightError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .get(&params.origin)
            .cloned()
            .ok_or(FlightError::HttpStatus(500))
    }
}

fn flight(id: &str, airline: &str, price: f64, stops: u32) -> Flight {
    Flight {
        id: id.into(),
        airline: airline.into(),
        price,
        stops,
        departure_time: "2026-02-03T10:00:00".into(),
        arrival_time: "2026-02-03T22:00:00".into(),
        duration: "PT12H".into(),
    }
}

fn eze_jfk_flights() -> Vec<Flight> {
    vec![
        flight("1", "IBERIA", 100.0, 1),
        flight("2", "DELTA", 200.0, 0),
        flight("3", "IBERIA", 300.0, 2),
    ]
}

fn prices(page: &SearchPage<CannedProvider>) -> Vec<f64> {
    page.view().flights.iter().map(|f| f.price).collect()
}

const EZE_JFK: &str = "?origin=EZE&destination=JFK&date=2026-02-03";

#[tokio::test]
async fn shared_link_search_filter_and_reset() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), EZE_JFK);

    assert!(page.load().is_some());
    page.settle().await;

    let view = page.view();
    assert_eq!(view.status, SearchStatus::Success);
    assert_eq!(view.total, 3);
    assert_eq!(view.price_bounds, PriceBounds { min: 100.0, max: 300.0 });
    assert_eq!(view.airlines, vec!["IBERIA", "DELTA"]);
    assert_eq!(prices(&page), vec![100.0, 200.0, 300.0]);
    assert_eq!(
        page.location().query(),
        "?origin=EZE&destination=JFK&date=2026-02-03&minPrice=100&maxPrice=300"
    );

    page.set_price_range(150.0, 250.0);
    assert_eq!(prices(&page), vec![200.0]);
    assert_eq!(
        page.location().query(),
        "?origin=EZE&destination=JFK&date=2026-02-03&minPrice=150&maxPrice=250"
    );

    page.reset_filters();
    assert_eq!(prices(&page), vec![100.0, 200.0, 300.0]);
    assert!(page.location().query().ends_with("minPrice=100&maxPrice=300"));
    assert_eq!(page.location().history_len(), 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn load_searches_once() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), EZE_JFK);

    page.load();
    page.settle().await;
    assert!(page.load().is_none());
    page.refresh();

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn incomplete_link_does_not_search() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), "?origin=EZE&stops=0");

    assert!(page.load().is_none());
    assert_eq!(provider.calls(), 0);

    let view = page.view();
    assert_eq!(view.status, SearchStatus::Idle);
    assert!(view.flights.is_empty());
    assert_eq!(view.query, "?origin=EZE&stops=0");
}

#[tokio::test]
async fn link_filters_survive_first_reset() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(
        Arc::clone(&provider),
        "?origin=EZE&destination=JFK&date=2026-02-03&airlines=IBERIA&maxPrice=250",
    );

    page.load();
    page.settle().await;

    let view = page.view();
    assert_eq!(view.filters.airlines, vec!["IBERIA"]);
    assert_eq!(view.filters.price_range.min, 100.0);
    assert_eq!(view.filters.price_range.max, 250.0);
    assert_eq!(prices(&page), vec![100.0]);
    assert_eq!(
        page.location().query(),
        "?origin=EZE&destination=JFK&date=2026-02-03&airlines=IBERIA&minPrice=100&maxPrice=250"
    );
}

#[tokio::test]
async fn link_price_outside_bounds_is_clamped() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(
        Arc::clone(&provider),
        "?origin=EZE&destination=JFK&date=2026-02-03&minPrice=10&maxPrice=9000&stops=0",
    );

    page.load();
    page.settle().await;

    let view = page.view();
    assert_eq!(view.filters.stops, StopsFilter::Nonstop);
    assert_eq!(view.filters.price_range.min, 100.0);
    assert_eq!(view.filters.price_range.max, 300.0);
    assert_eq!(prices(&page), vec![200.0]);
}

#[tokio::test]
async fn invalid_submit_never_reaches_provider() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), "");

    assert!(matches!(
        page.submit("EZ", "JFK", "2026-02-03"),
        Err(FlightError::InvalidAirport(_))
    ));
    assert!(matches!(
        page.submit("EZE", "JFK", "2026-02-30"),
        Err(FlightError::InvalidDate(_))
    ));
    assert!(page.submit("EZE", "", "2026-02-03").is_err());

    assert_eq!(provider.calls(), 0);
    assert_eq!(page.view().status, SearchStatus::Idle);
}

#[tokio::test]
async fn new_search_resets_filters() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    provider.add(
        "MAD",
        vec![flight("4", "IBERIA", 500.0, 0), flight("5", "LATAM", 700.0, 1)],
    );
    let mut page = SearchPage::new(Arc::clone(&provider), "");

    page.submit("eze", "jfk", "2026-02-03").unwrap();
    page.settle().await;
    page.set_stops(StopsFilter::Nonstop);
    page.toggle_airline("DELTA");
    assert_eq!(prices(&page), vec![200.0]);

    page.submit("MAD", "JFK", "2026-02-03").unwrap();
    page.settle().await;

    let view = page.view();
    assert_eq!(view.filters.stops, StopsFilter::Any);
    assert!(view.filters.airlines.is_empty());
    assert_eq!(view.price_bounds, PriceBounds { min: 500.0, max: 700.0 });
    assert_eq!(prices(&page), vec![500.0, 700.0]);
    assert_eq!(
        view.query,
        "?origin=MAD&destination=JFK&date=2026-02-03&minPrice=500&maxPrice=700"
    );
}

#[tokio::test]
async fn failed_search_shows_generic_error() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), "");

    page.submit("LIM", "JFK", "2026-02-03").unwrap();
    page.settle().await;

    let view = page.view();
    assert_eq!(view.status, SearchStatus::Error);
    assert_eq!(view.error.as_deref(), Some(LOAD_FAILED_MESSAGE));
    assert!(view.flights.is_empty());
    assert!(view.chart.is_empty());
    assert!(view.airlines.is_empty());
    assert_eq!(view.query, "");
}

#[tokio::test]
async fn sort_and_chart_follow_visible_flights() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), EZE_JFK);

    page.load();
    page.settle().await;
    page.set_sort(SortState {
        key: SortKey::Price,
        order: SortOrder::Desc,
    });
    assert_eq!(prices(&page), vec![300.0, 200.0, 100.0]);

    let chart = page.view().chart;
    assert_eq!(chart.len(), 2);
    assert_eq!(chart[0].airline, "IBERIA");
    assert_eq!(chart[0].average_price, 200.0);
    assert_eq!(chart[1].airline, "DELTA");

    let before = page.location().query().to_string();
    page.set_sort(SortState {
        key: SortKey::Airline,
        order: SortOrder::Asc,
    });
    assert_eq!(page.location().query(), before);
}

const LINK_WITH_FILTERS: &str =
    "?origin=EZE&destination=JFK&date=2026-02-03&stops=1&airlines=IBERIA&maxPrice=250";

fn mad_jfk_flights() -> Vec<Flight> {
    vec![flight("4", "LATAM", 500.0, 0), flight("5", "IBERIA", 700.0, 1)]
}

fn assert_fresh_mad_results(page: &SearchPage<CannedProvider>) {
    let view = page.view();
    assert_eq!(view.status, SearchStatus::Success);
    assert_eq!(view.filters.stops, StopsFilter::Any);
    assert!(view.filters.airlines.is_empty());
    assert_eq!(view.filters.price_range.min, 500.0);
    assert_eq!(view.filters.price_range.max, 700.0);
    assert_eq!(prices(page), vec![500.0, 700.0]);
    assert_eq!(
        view.query,
        "?origin=MAD&destination=JFK&date=2026-02-03&minPrice=500&maxPrice=700"
    );
}

#[tokio::test]
async fn failed_link_filters_do_not_leak_into_next_search() {
    let provider = CannedProvider::with("MAD", mad_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), LINK_WITH_FILTERS);

    page.load();
    page.settle().await;
    assert_eq!(page.view().status, SearchStatus::Error);

    page.submit("MAD", "JFK", "2026-02-03").unwrap();
    page.settle().await;

    assert_fresh_mad_results(&page);
    assert!(!page.engine().has_staged_filters());
}

#[tokio::test]
async fn superseded_link_filters_do_not_leak_into_next_search() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    provider.add("MAD", mad_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), LINK_WITH_FILTERS);

    page.load();
    page.submit("MAD", "JFK", "2026-02-03").unwrap();
    page.settle().await;

    assert_fresh_mad_results(&page);
}

#[tokio::test]
async fn resubmitting_the_linked_search_starts_from_defaults() {
    let provider = CannedProvider::with("EZE", eze_jfk_flights());
    let mut page = SearchPage::new(Arc::clone(&provider), LINK_WITH_FILTERS);

    page.load();
    page.submit("EZE", "JFK", "2026-02-03").unwrap();
    page.settle().await;

    let view = page.view();
    assert_eq!(view.filters.stops, StopsFilter::Any);
    assert!(view.filters.airlines.is_empty());
    assert_eq!(prices(&page), vec![100.0, 200.0, 300.0]);
}
