//! Location search that only reports results for the most recent query.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{model::Location, provider::WeatherProvider};

/// Queries shorter than this are not sent to the provider.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

/// Hands out increasing tickets; only the newest one is current.
#[derive(Debug, Default)]
pub struct SearchSequencer {
    latest: AtomicU64,
}

impl SearchSequencer {
    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<Location>),
    /// A newer query was issued while this one was in flight.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct LocationSearch {
    provider: Arc<dyn WeatherProvider>,
    sequencer: Arc<SearchSequencer>,
}

impl LocationSearch {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            sequencer: Arc::new(SearchSequencer::default()),
        }
    }

    pub async fn search(&self, query: &str) -> SearchOutcome {
        let ticket = self.sequencer.issue();
        let query = query.trim();

        if query.chars().count() < MIN_QUERY_LEN {
            return SearchOutcome::Results(Vec::new());
        }

        let found = self.provider.search_locations(query).await;

        if self.sequencer.is_current(ticket) {
            SearchOutcome::Results(found)
        } else {
            tracing::debug!(query, "discarding results of superseded search");
            SearchOutcome::Superseded
        }
    }
}
