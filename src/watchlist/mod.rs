use crate::models::{WatchSummary, WatchedEntry};
use crate::storage::{DurableStore, PersistentState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// What `append` does when the title is already in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Replace,
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("{0} is already in the watchlist")]
    Duplicate(String),
    #[error("rating {rating} is outside 1..={max}")]
    RatingOutOfRange { rating: u8, max: u8 },
    #[error("failed to save watchlist: {0}")]
    Persist(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Added,
    Replaced,
}

pub struct WatchlistStore {
    state: PersistentState<Vec<WatchedEntry>>,
    policy: DuplicatePolicy,
    max_rating: u8,
}

impl WatchlistStore {
    pub fn open(
        store: Arc<dyn DurableStore>,
        key: &str,
        policy: DuplicatePolicy,
        max_rating: u8,
    ) -> Self {
        let state = PersistentState::init(Vec::new(), key, store);
        info!("Watchlist opened with {} entries", state.get().len());
        Self {
            state,
            policy,
            max_rating,
        }
    }

    #[instrument(skip(self, entry), fields(id = %entry.id))]
    pub fn append(&mut self, entry: WatchedEntry) -> Result<Appended, WatchlistError> {
        if entry.user_rating == 0 || entry.user_rating > self.max_rating {
            return Err(WatchlistError::RatingOutOfRange {
                rating: entry.user_rating,
                max: self.max_rating,
            });
        }

        let existing = self.state.get().iter().position(|e| e.id == entry.id);
        match (existing, self.policy) {
            (Some(_), DuplicatePolicy::Reject) => {
                warn!("Rejected duplicate watchlist entry");
                Err(WatchlistError::Duplicate(entry.id))
            }
            (Some(index), DuplicatePolicy::Replace) => {
                self.state.update(|entries| entries[index] = entry)?;
                info!("Replaced watchlist entry");
                Ok(Appended::Replaced)
            }
            (None, _) => {
                self.state.update(|entries| entries.push(entry))?;
                info!("Added watchlist entry");
                Ok(Appended::Added)
            }
        }
    }

    /// Removes every entry with `id`. Missing ids are not an error.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> Result<usize, WatchlistError> {
        let before = self.state.get().len();
        self.state.update(|entries| entries.retain(|e| e.id != id))?;
        let removed = before - self.state.get().len();
        info!("Removed {} watchlist entries", removed);
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&WatchedEntry> {
        self.state.get().iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[WatchedEntry] {
        self.state.get()
    }

    pub fn max_rating(&self) -> u8 {
        self.max_rating
    }

    pub fn summary(&self) -> WatchSummary {
        let entries = self.state.get();
        WatchSummary {
            count: entries.len(),
            average_imdb_rating: average(entries.iter().map(|e| e.imdb_rating)),
            average_user_rating: average(entries.iter().map(|e| f64::from(e.user_rating))),
            average_runtime_minutes: average(entries.iter().map(|e| f64::from(e.runtime_minutes))),
        }
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}
