use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Error,
    Success,
}

/// Observable state of a fetcher. `subject` is the query or id it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub subject: String,
    pub status: FetchStatus,
    pub data: T,
    pub error_message: String,
}

impl<T: Default> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            subject: String::new(),
            status: FetchStatus::Idle,
            data: T::default(),
            error_message: String::new(),
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// At most one outstanding request. Starting a new one aborts the previous
/// task and bumps the generation so a task that already got past its last
/// await point still cannot write.
pub struct Inflight {
    generation: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct Ticket {
    generation: Arc<AtomicU64>,
    issued: u64,
}

impl Ticket {
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.issued
    }

    /// Applies `update` only if this request has not been superseded.
    /// Runs under the channel's write lock.
    pub fn apply<T>(&self, state: &watch::Sender<T>, update: impl FnOnce(&mut T)) -> bool {
        state.send_if_modified(|current| {
            if !self.is_current() {
                return false;
            }
            update(current);
            true
        })
    }
}

impl Inflight {
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Cancels whatever is running and returns a ticket for the next request.
    pub fn supersede(&mut self) -> Ticket {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation: Arc::clone(&self.generation),
            issued,
        }
    }

    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }
}

impl Drop for Inflight {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Waits until `rx` holds a state that is no longer loading.
pub async fn settled<T: Clone>(mut rx: watch::Receiver<FetchState<T>>) -> FetchState<T> {
    loop {
        {
            let current = rx.borrow_and_update();
            if !current.is_loading() {
                return current.clone();
            }
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superseded_ticket_cannot_apply() {
        let (tx, _rx) = watch::channel(0u32);
        let mut inflight = Inflight::new();
        let first = inflight.supersede();
        let second = inflight.supersede();

        assert!(!first.apply(&tx, |v| *v = 1));
        assert_eq!(*tx.borrow(), 0);
        assert!(second.apply(&tx, |v| *v = 2));
        assert_eq!(*tx.borrow(), 2);
    }

    #[tokio::test]
    async fn dropping_inflight_aborts_task() {
        let mut inflight = Inflight::new();
        let _ticket = inflight.supersede();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            std::future::pending::<()>().await;
            let _ = done_tx.send(());
        });
        inflight.track(handle);
        drop(inflight);
        // the sender is dropped with the aborted task, never sent
        assert!(done_rx.await.is_err());
    }
}
