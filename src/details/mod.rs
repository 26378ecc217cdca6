use crate::fetch::{self, FetchState, FetchStatus, Inflight};
use crate::models::TitleDetail;
use crate::omdb::MovieApi;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

pub type DetailState = FetchState<Option<TitleDetail>>;

/// Fetches full details for the selected title. A new selection cancels the
/// previous request before starting its own.
pub struct DetailFetcher {
    api: Arc<dyn MovieApi>,
    state: watch::Sender<DetailState>,
    inflight: Inflight,
    selected: Option<String>,
}

impl DetailFetcher {
    pub fn new(api: Arc<dyn MovieApi>) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            api,
            state,
            inflight: Inflight::new(),
            selected: None,
        }
    }

    /// Must be called from within a tokio runtime.
    #[instrument(skip(self))]
    pub fn observe(&mut self, id: Option<&str>) {
        if self.selected.as_deref() == id {
            return;
        }
        self.selected = id.map(str::to_string);
        let ticket = self.inflight.supersede();

        let Some(id) = id else {
            debug!("Selection cleared");
            self.state.send_replace(DetailState::default());
            return;
        };

        self.state.send_replace(DetailState {
            subject: id.to_string(),
            status: FetchStatus::Loading,
            ..DetailState::default()
        });

        let api = Arc::clone(&self.api);
        let state = self.state.clone();
        let id = id.to_string();
        let handle = tokio::spawn(async move {
            let outcome = api.details(&id).await;
            ticket.apply(&state, |s| match outcome {
                Ok(detail) => {
                    info!("Loaded details for {}", id);
                    s.status = FetchStatus::Success;
                    s.data = Some(detail);
                    s.error_message.clear();
                }
                Err(e) => {
                    info!("Details for {} failed: {}", id, e);
                    s.status = FetchStatus::Error;
                    s.data = None;
                    s.error_message = e.to_string();
                }
            });
        });
        self.inflight.track(handle);
    }

    #[cfg(test)]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub async fn settled(&self) -> DetailState {
        fetch::settled(self.subscribe()).await
    }
}

/// Counts how often the rating of the open title changed to a new nonzero value.
#[derive(Debug, Default)]
pub struct RatingCounter {
    last: u8,
    changes: u32,
}

impl RatingCounter {
    pub fn record(&mut self, rating: u8) {
        if rating != 0 && rating != self.last {
            self.changes += 1;
        }
        self.last = rating;
    }

    pub fn changes(&self) -> u32 {
        self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::{detail, FakeApi};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn loads_selected_detail() {
        let api = Arc::new(FakeApi::default());
        let mut fetcher = DetailFetcher::new(api);

        fetcher.observe(Some("tt1"));
        assert!(fetcher.state().is_loading());
        let state = fetcher.settled().await;
        assert_eq!(state.status, FetchStatus::Success);
        assert_eq!(state.data, Some(detail("tt1")));
    }

    #[tokio::test(start_paused = true)]
    async fn later_selection_wins_regardless_of_timing() {
        let api = Arc::new(FakeApi::default().with_delay("A", 300).with_delay("B", 20));
        let mut fetcher = DetailFetcher::new(api.clone());

        fetcher.observe(Some("A"));
        tokio::task::yield_now().await;
        fetcher.observe(Some("B"));

        let state = fetcher.settled().await;
        assert_eq!(state.data, Some(detail("B")));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetcher.state().data, Some(detail("B")));
        assert_eq!(api.calls(), vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_later_selection_still_wins() {
        let api = Arc::new(FakeApi::default().with_delay("A", 20).with_delay("B", 300));
        let mut fetcher = DetailFetcher::new(api);

        fetcher.observe(Some("A"));
        tokio::task::yield_now().await;
        fetcher.observe(Some("B"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fetcher.state().is_loading());

        let state = fetcher.settled().await;
        assert_eq!(state.data, Some(detail("B")));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_message() {
        let api = Arc::new(FakeApi {
            missing: vec!["tt0".to_string()],
            ..FakeApi::default()
        });
        let mut fetcher = DetailFetcher::new(api);

        fetcher.observe(Some("tt0"));
        let state = fetcher.settled().await;
        assert_eq!(state.status, FetchStatus::Error);
        assert_eq!(state.error_message, "Unable to fetch Movie details");
        assert!(state.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_selection_cancels_and_idles() {
        let api = Arc::new(FakeApi::default().with_delay("tt1", 200));
        let mut fetcher = DetailFetcher::new(api);

        fetcher.observe(Some("tt1"));
        tokio::task::yield_now().await;
        fetcher.observe(None);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = fetcher.state();
        assert_eq!(state.status, FetchStatus::Idle);
        assert!(state.data.is_none());
        assert_eq!(fetcher.selected(), None);
    }

    #[test]
    fn rating_counter_counts_changes_to_new_nonzero_values() {
        let mut counter = RatingCounter::default();
        counter.record(0);
        assert_eq!(counter.changes(), 0);
        counter.record(7);
        counter.record(7);
        assert_eq!(counter.changes(), 1);
        counter.record(9);
        assert_eq!(counter.changes(), 2);
        counter.record(0);
        counter.record(9);
        assert_eq!(counter.changes(), 3);
    }
}
