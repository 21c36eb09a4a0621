//! Debounced search-as-you-type.
//!
//! Every keystroke replaces the pending search: the previous one is aborted,
//! whether it is still waiting out the debounce or already in flight. An
//! aborted search never touches the state. A failed one clears the results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use nextcart_core::Product;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::ClientError;

/// Wait this long after the last keystroke before searching.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this (after trimming) don't search.
pub const MIN_QUERY_CHARS: usize = 2;

/// Where typeahead results come from.
#[async_trait]
pub trait SearchSource: Send + Sync + 'static {
    async fn search(&self, query: &str) -> Result<Vec<Product>, ClientError>;
}

/// What the search box shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeaheadState {
    pub query: String,
    pub results: Vec<Product>,
    pub is_loading: bool,
    /// Whether the suggestion dropdown is open.
    pub is_open: bool,
}

/// Debounced typeahead over a [`SearchSource`].
///
/// Must be used from within a Tokio runtime.
pub struct Typeahead<S: SearchSource> {
    source: Arc<S>,
    debounce: Duration,
    state: watch::Sender<TypeaheadState>,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<AbortHandle>>,
}

impl<S: SearchSource> Typeahead<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_debounce(source, DEBOUNCE)
    }

    #[must_use]
    pub fn with_debounce(source: S, debounce: Duration) -> Self {
        Self {
            source: Arc::new(source),
            debounce,
            state: watch::Sender::new(TypeaheadState::default()),
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TypeaheadState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TypeaheadState> {
        self.state.subscribe()
    }

    /// The user typed; replace any pending search with one for `query`.
    pub fn set_query(&self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_pending();

        let trimmed = query.trim().to_string();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            self.state.send_replace(TypeaheadState {
                query: query.to_string(),
                ..TypeaheadState::default()
            });
            return;
        }

        self.state.send_modify(|state| {
            state.query = query.to_string();
            state.is_loading = true;
        });

        let source = Arc::clone(&self.source);
        let state = self.state.clone();
        let current = Arc::clone(&self.generation);
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let outcome = source.search(&trimmed).await;

            state.send_if_modified(|state| {
                // A newer keystroke owns the state now
                if current.load(Ordering::SeqCst) != generation {
                    return false;
                }
                match outcome {
                    Ok(results) => {
                        state.results = results;
                        state.is_open = true;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, query = %trimmed, "Typeahead search failed");
                        state.results.clear();
                        state.is_open = false;
                    }
                }
                state.is_loading = false;
                true
            });
        });

        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());
    }

    /// Reopen the dropdown on focus if there is something to show.
    pub fn focus(&self) {
        self.state.send_if_modified(|state| {
            let open = !state.results.is_empty();
            let changed = state.is_open != open;
            state.is_open = open;
            changed
        });
    }

    /// Search page for the current query, if it isn't blank.
    #[must_use]
    pub fn submit(&self) -> Option<String> {
        let query = self.state.borrow().query.trim().to_string();
        if query.is_empty() {
            return None;
        }
        self.close();
        Some(format!("/search?q={}", urlencoding::encode(&query)))
    }

    /// Product page for a picked suggestion.
    #[must_use]
    pub fn select(&self, slug: Option<&str>) -> Option<String> {
        let slug = slug.filter(|s| !s.is_empty())?;
        self.close();
        Some(format!("/product/{slug}"))
    }

    fn close(&self) {
        self.state.send_modify(|state| state.is_open = false);
    }

    fn abort_pending(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl<S: SearchSource> Drop for Typeahead<S> {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
