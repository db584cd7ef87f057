use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::chart::build_price_chart;
use crate::error::FlightError;
use crate::fetch::FlightProvider;
use crate::filter::FilterEngine;
use crate::model::{
    Flight, FlightFilters, PriceBounds, PriceChartItem, SearchParams, SearchStatus, SortState,
    StopsFilter,
};
use crate::session::{SearchSession, SessionSnapshot};
use crate::url_state::{Location, UrlSync};

/// Everything needed to render the results page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub status: SearchStatus,
    pub error: Option<String>,
    pub search: Option<SearchParams>,
    pub flights: Vec<Flight>,
    pub total: usize,
    pub price_bounds: PriceBounds,
    pub filters: FlightFilters,
    pub sort: SortState,
    pub airlines: Vec<String>,
    pub chart: Vec<PriceChartItem>,
    pub query: String,
}

/// Search session, filter engine and URL synchronizer wired together:
/// submit → session → engine reset → user tweaks → URL reflection.
pub struct SearchPage<P> {
    session: SearchSession<P>,
    engine: FilterEngine,
    url: UrlSync,
    location: Location,
}

impl<P: FlightProvider + 'static> SearchPage<P> {
    pub fn new(provider: Arc<P>, query: impl Into<String>) -> Self {
        Self {
            session: SearchSession::new(provider),
            engine: FilterEngine::new(),
            url: UrlSync::new(),
            location: Location::new(query),
        }
    }

    pub fn session(&self) -> &SearchSession<P> {
        &self.session
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Hydrates from the current location. Issues a search when the URL
    /// carries a complete one; does nothing on every call after the first.
    pub fn load(&mut self) -> Option<JoinHandle<()>> {
        let hydration = self.url.hydrate(self.location.query())?;
        let search = hydration.search?;
        self.engine
            .stage_url_filters(&search.search_key(), hydration.filters);
        Some(self.session.search_flights(search))
    }

    /// Validates at the boundary; invalid input never reaches the session.
    /// Filters still waiting from a shared link belong to that link's search
    /// and are dropped.
    pub fn submit(
        &mut self,
        origin: &str,
        destination: &str,
        date: &str,
    ) -> Result<JoinHandle<()>, FlightError> {
        let params = SearchParams::from_input(origin, destination, date)?;
        self.engine.clear_staged_filters();
        Ok(self.session.search_flights(params))
    }

    /// Waits until the latest search leaves `Loading`, then refreshes.
    pub async fn settle(&mut self) {
        let mut updates = self.session.subscribe();
        let _ = updates
            .wait_for(|s| s.status != SearchStatus::Loading)
            .await;
        self.refresh();
    }

    /// Pulls the session state through the engine and into the location.
    pub fn refresh(&mut self) {
        let snapshot = self.session.snapshot();
        self.engine.sync(
            &snapshot.flights,
            snapshot.generation,
            snapshot.completed_key().as_deref(),
        );
        self.reflect(&snapshot);
    }

    fn reflect(&mut self, snapshot: &SessionSnapshot) {
        if let Some(query) = self.url.reflect(
            snapshot.status,
            snapshot.last_search.as_ref(),
            self.engine.filters(),
        ) {
            self.location.replace(query);
        }
    }

    fn after_change(&mut self) {
        let snapshot = self.session.snapshot();
        self.reflect(&snapshot);
    }

    pub fn set_stops(&mut self, stops: StopsFilter) {
        self.engine.set_stops(stops);
        self.after_change();
    }

    pub fn set_price_range(&mut self, min: f64, max: f64) {
        self.engine.set_price_range(min, max);
        self.after_change();
    }

    pub fn toggle_airline(&mut self, airline: &str) {
        self.engine.toggle_airline(airline);
        self.after_change();
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.engine.set_sort(sort);
    }

    pub fn reset_filters(&mut self) {
        self.engine.reset_filters();
        self.after_change();
    }

    pub fn view(&self) -> PageView {
        let snapshot = self.session.snapshot();
        let success = snapshot.status == SearchStatus::Success;

        let visible = self.engine.sorted_flights(&snapshot.flights);
        let chart = if success {
            build_price_chart(&visible)
        } else {
            Vec::new()
        };
        let airlines = if success {
            FilterEngine::available_airlines(&snapshot.flights)
        } else {
            Vec::new()
        };

        PageView {
            status: snapshot.status,
            error: snapshot.error.clone(),
            search: snapshot.last_search.clone(),
            flights: visible.into_iter().cloned().collect(),
            total: snapshot.flights.len(),
            price_bounds: self.engine.price_bounds(),
            filters: self.engine.filters().clone(),
            sort: self.engine.sort(),
            airlines,
            chart,
            query: self.location.query().to_string(),
        }
    }
}
