use crate::fetch::{self, FetchState, FetchStatus, Inflight};
use crate::models::SearchResultSummary;
use crate::omdb::MovieApi;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

pub type SearchState = FetchState<Vec<SearchResultSummary>>;

/// Keystroke-driven search. Short queries never reach the network and each
/// new query cancels the one before it.
pub struct SearchFetcher {
    api: Arc<dyn MovieApi>,
    min_query_length: usize,
    state: watch::Sender<SearchState>,
    inflight: Inflight,
    last_query: Option<String>,
}

impl SearchFetcher {
    pub fn new(api: Arc<dyn MovieApi>, min_query_length: usize) -> Self {
        let (state, _) = watch::channel(SearchState::default());
        Self {
            api,
            min_query_length,
            state,
            inflight: Inflight::new(),
            last_query: None,
        }
    }

    /// Must be called from within a tokio runtime.
    #[instrument(skip(self))]
    pub fn observe(&mut self, query: &str) {
        if self.last_query.as_deref() == Some(query) {
            return;
        }
        self.last_query = Some(query.to_string());
        let ticket = self.inflight.supersede();

        if query.chars().count() < self.min_query_length {
            debug!("Query below minimum length, staying idle");
            self.state.send_replace(SearchState {
                subject: query.to_string(),
                ..SearchState::default()
            });
            return;
        }

        self.state.send_modify(|s| {
            s.subject = query.to_string();
            s.status = FetchStatus::Loading;
            s.error_message.clear();
        });

        let api = Arc::clone(&self.api);
        let state = self.state.clone();
        let query = query.to_string();
        let handle = tokio::spawn(async move {
            let outcome = api.search(&query).await;
            ticket.apply(&state, |s| match outcome {
                Ok(results) => {
                    info!("Search for {:?} found {} results", query, results.len());
                    s.status = FetchStatus::Success;
                    s.data = results;
                    s.error_message.clear();
                }
                Err(e) => {
                    info!("Search for {:?} failed: {}", query, e);
                    s.status = FetchStatus::Error;
                    s.data.clear();
                    s.error_message = e.to_string();
                }
            });
        });
        self.inflight.track(handle);
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub async fn settled(&self) -> SearchState {
        fetch::settled(self.subscribe()).await
    }
}
