use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{FlightError, LOAD_FAILED_MESSAGE};
use crate::fetch::FlightProvider;
use crate::model::{Flight, SearchParams, SearchStatus};

/// Observable state of the search session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub status: SearchStatus,
    pub flights: Arc<Vec<Flight>>,
    pub error: Option<String>,
    pub last_search: Option<SearchParams>,
    /// Bumped every time `flights` is replaced.
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn search_key(&self) -> Option<String> {
        self.last_search.as_ref().map(SearchParams::search_key)
    }

    /// Key of the search that produced `flights`, once it has succeeded.
    pub fn completed_key(&self) -> Option<String> {
        match self.status {
            SearchStatus::Success => self.search_key(),
            _ => None,
        }
    }
}

/// Handle for one issued search. Only the ticket with the highest sequence
/// number may apply its result.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub seq: u64,
    pub params: SearchParams,
    token: CancellationToken,
}

impl SearchTicket {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
struct InFlight {
    seq: u64,
    token: Option<CancellationToken>,
}

struct Shared {
    in_flight: Mutex<InFlight>,
    state: watch::Sender<SessionSnapshot>,
}

/// Owns the request lifecycle of "search flights by origin/destination/date":
/// the flight set, the status and the last accepted search.
pub struct SearchSession<P> {
    provider: Arc<P>,
    shared: Arc<Shared>,
}

impl<P> Clone for SearchSession<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: FlightProvider + 'static> SearchSession<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            provider,
            shared: Arc::new(Shared {
                in_flight: Mutex::new(InFlight::default()),
                state,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.state.subscribe()
    }

    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.shared
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a search: cancels whatever was in flight, moves to `Loading`
    /// and records `params` as the last search before any response exists.
    pub fn begin(&self, params: SearchParams) -> SearchTicket {
        let mut in_flight = self.in_flight();

        if let Some(previous) = in_flight.token.take() {
            previous.cancel();
            tracing::debug!(seq = in_flight.seq, "cancelled superseded search");
        }

        in_flight.seq += 1;
        let token = CancellationToken::new();
        in_flight.token = Some(token.clone());

        self.shared.state.send_modify(|state| {
            state.status = SearchStatus::Loading;
            state.error = None;
            state.last_search = Some(params.clone());
        });

        tracing::debug!(seq = in_flight.seq, key = %params.search_key(), "search issued");

        SearchTicket {
            seq: in_flight.seq,
            params,
            token,
        }
    }

    /// Applies a response if it belongs to the latest search and was not
    /// cancelled. Returns whether the state changed.
    pub fn complete(
        &self,
        ticket: &SearchTicket,
        result: Result<Vec<Flight>, FlightError>,
    ) -> bool {
        let mut in_flight = self.in_flight();

        if ticket.seq != in_flight.seq {
            tracing::trace!(
                seq = ticket.seq,
                latest = in_flight.seq,
                "discarding stale search response"
            );
            return false;
        }

        if ticket.is_cancelled() || matches!(result, Err(FlightError::Cancelled)) {
            tracing::trace!(seq = ticket.seq, "search abandoned");
            return false;
        }

        in_flight.token = None;

        self.shared.state.send_modify(|state| {
            state.generation += 1;
            match result {
                Ok(flights) => {
                    tracing::debug!(seq = ticket.seq, count = flights.len(), "search succeeded");
                    state.status = SearchStatus::Success;
                    state.flights = Arc::new(flights);
                    state.error = None;
                }
                Err(err) => {
                    tracing::warn!(seq = ticket.seq, error = %err, "search failed");
                    state.status = SearchStatus::Error;
                    state.flights = Arc::new(Vec::new());
                    state.error = Some(LOAD_FAILED_MESSAGE.to_string());
                }
            }
        });

        true
    }

    /// Fire-and-forget search. The returned handle may be dropped; progress is
    /// observed through `snapshot` or `subscribe`.
    pub fn search_flights(&self, params: SearchParams) -> JoinHandle<()> {
        let ticket = self.begin(params);
        let session = self.clone();

        tokio::spawn(async move {
            let token = ticket.token();
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = session.provider.search(&ticket.params, ticket.token()) => result,
            };
            session.complete(&ticket, result);
        })
    }
}
