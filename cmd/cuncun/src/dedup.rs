use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

/// Default number of event ids remembered.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Remembers the most recent event ids so platform retries are handled
/// once.
pub struct EventDedup {
    capacity: usize,
    inner: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl EventDedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Window::default()),
        }
    }

    /// Record `id`. Returns false if it is already in the window.
    pub fn first_seen(&self, id: &str) -> bool {
        let mut w = self.inner.lock();
        if w.seen.contains(id) {
            return false;
        }
        if w.order.len() == self.capacity
            && let Some(oldest) = w.order.pop_front()
        {
            w.seen.remove(&oldest);
        }
        w.order.push_back(id.to_string());
        w.seen.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }
}

impl Default for EventDedup {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
