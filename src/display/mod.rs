use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
struct Shown {
    owner: u64,
    title: Option<String>,
}

/// The title shown for the running view. Owned by the presentation layer.
#[derive(Clone)]
pub struct DisplaySurface {
    default_title: Arc<str>,
    shown: Arc<Mutex<Shown>>,
}

/// Holds the surface title while alive; restores the default when dropped,
/// unless a newer guard has taken the surface since.
pub struct TitleGuard {
    surface: DisplaySurface,
    owner: u64,
}

impl DisplaySurface {
    pub fn new(default_title: &str) -> Self {
        Self {
            default_title: Arc::from(default_title),
            shown: Arc::new(Mutex::new(Shown::default())),
        }
    }

    pub fn title(&self) -> String {
        self.shown
            .lock()
            .ok()
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| self.default_title.to_string())
    }

    /// Shows `Movie | <title>` until the guard is dropped.
    pub fn acquire(&self, movie_title: &str) -> TitleGuard {
        let title = format!("Movie | {}", movie_title);
        debug!("Display title: {}", title);
        let owner = match self.shown.lock() {
            Ok(mut shown) => {
                shown.owner += 1;
                shown.title = Some(title);
                shown.owner
            }
            Err(_) => 0,
        };
        TitleGuard {
            surface: self.clone(),
            owner,
        }
    }
}

impl Drop for TitleGuard {
    fn drop(&mut self) {
        if let Ok(mut shown) = self.surface.shown.lock() {
            if shown.owner == self.owner {
                debug!("Display title restored");
                shown.title = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_sets_and_restores() {
        let surface = DisplaySurface::new("usePopcorn");
        {
            let _guard = surface.acquire("Inception");
            assert_eq!(surface.title(), "Movie | Inception");
        }
        assert_eq!(surface.title(), "usePopcorn");
    }

    #[test]
    fn superseded_guard_does_not_clobber_newer_title() {
        let surface = DisplaySurface::new("usePopcorn");
        let mut guard = surface.acquire("First");
        assert_eq!(surface.title(), "Movie | First");
        // the new guard exists before the old one drops
        guard = surface.acquire("Second");
        assert_eq!(surface.title(), "Movie | Second");
        drop(guard);
        assert_eq!(surface.title(), "usePopcorn");
    }
}
