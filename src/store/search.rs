//! Query-driven post search.
//!
//! Keystrokes are coalesced by a [`Debouncer`]; each issued query takes the
//! next generation number and only a response carrying the latest generation
//! may touch `results`. Network latency therefore cannot let an older query
//! overwrite a newer one.

use crate::api::{ApiClient, ApiError, Post};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

// ============================================================================
// Debouncer
// ============================================================================

/// Holds the latest input until no new input arrived for `window`.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<T>,
    last_input: Option<Instant>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_input: None,
        }
    }

    /// Record new input, restarting the quiescence window.
    pub fn push(&mut self, value: T) {
        self.pending = Some(value);
        self.last_input = Some(Instant::now());
    }

    /// Take the pending value if the window has elapsed since the last push.
    pub fn poll(&mut self) -> Option<T> {
        let last = self.last_input?;
        if last.elapsed() < self.window {
            return None;
        }
        self.last_input = None;
        self.pending.take()
    }

    /// When the pending value becomes ready, for `sleep_until` in a select loop.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_input.map(|last| last + self.window)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
        self.last_input = None;
    }
}

// ============================================================================
// Search Store
// ============================================================================

/// Ticket for one issued search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub query: String,
}

#[derive(Debug, Default)]
pub struct SearchStore {
    results: Vec<Post>,
    query: String,
    generation: u64,
    loading: bool,
    error: Option<String>,
}

impl SearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[Post] {
        &self.results
    }

    /// The most recently issued query (empty after a blank search).
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issue `query`. A blank query clears results and needs no request.
    ///
    /// Blank queries still advance the generation so a response for an
    /// earlier, non-blank query cannot repopulate the cleared results.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchRequest> {
        self.generation = self.generation.wrapping_add(1);
        self.error = None;

        if query.trim().is_empty() {
            self.results.clear();
            self.query.clear();
            self.loading = false;
            return None;
        }

        self.query = query.to_string();
        self.loading = true;
        Some(SearchRequest {
            generation: self.generation,
            query: query.to_string(),
        })
    }

    /// Commit a response. Returns false when it was stale and discarded.
    pub fn apply(&mut self, request: &SearchRequest, result: Result<Vec<Post>, ApiError>) -> bool {
        if request.generation != self.generation {
            tracing::debug!(
                expected = self.generation,
                got = request.generation,
                query = %request.query,
                "Ignoring stale search result (generation mismatch)"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(posts) => {
                tracing::debug!(query = %request.query, count = posts.len(), "Search completed");
                self.results = posts;
            }
            Err(e) => {
                tracing::warn!(query = %request.query, error = %e, "Search failed");
                self.error = Some(e.to_string());
            }
        }
        true
    }

    pub async fn search(&mut self, api: &ApiClient, query: &str) {
        let Some(request) = self.begin_search(query) else {
            return;
        };
        let result = api.search(&request.query).await;
        self.apply(&request, result);
    }
}
