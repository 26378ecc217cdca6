use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Listener {
    id: u64,
    key: String,
    on_match: Callback,
}

#[derive(Default)]
struct Registry {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

/// Global key listeners. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct KeyBindings {
    registry: Arc<Registry>,
}

/// A live binding; dropping it removes the listener.
pub struct KeyBinding {
    registry: Weak<Registry>,
    id: u64,
}

impl Registry {
    fn install(&self, key: &str, on_match: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Listener {
                id,
                key: key.to_string(),
                on_match,
            });
        }
        id
    }

    fn uninstall(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|l| l.id != id);
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, key: &str, on_match: impl Fn() + Send + Sync + 'static) -> KeyBinding {
        let id = self.registry.install(key, Arc::new(on_match));
        debug!("Bound key {}", key);
        KeyBinding {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }

    /// Fires every listener whose key matches, ignoring case. Returns how many fired.
    pub fn dispatch(&self, key: &str) -> usize {
        // callbacks run outside the lock so they may bind or unbind
        let matched: Vec<Callback> = match self.registry.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|l| l.key.eq_ignore_ascii_case(key))
                .map(|l| Arc::clone(&l.on_match))
                .collect(),
            Err(_) => return 0,
        };
        for callback in &matched {
            callback();
        }
        matched.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.registry.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl KeyBinding {
    /// Replaces this binding. The old listener is gone before the new one exists.
    pub fn rebind(&mut self, key: &str, on_match: impl Fn() + Send + Sync + 'static) {
        if let Some(registry) = self.registry.upgrade() {
            registry.uninstall(self.id);
            self.id = registry.install(key, Arc::new(on_match));
        }
    }
}

impl Drop for KeyBinding {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.uninstall(self.id);
        }
    }
}
