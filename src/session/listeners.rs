#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{AuthEvent, Session};

/// Callback invoked on every auth-state transition.
pub type Listener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

/// Ordered set of listeners owned by one session bus.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn subscribe<F>(&self, listener: F) -> u64
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(listener);
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Calls listeners in registration order. The lock is released before any
    /// callback runs, so listeners may subscribe or unsubscribe re-entrantly; a
    /// listener removed mid-delivery is skipped if it has not run yet.
    pub(crate) fn emit(&self, event: AuthEvent, session: Option<&Session>) -> usize {
        let snapshot: Vec<(u64, Listener)> = self.listeners.lock().clone();
        let mut delivered = 0;
        for (id, listener) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            listener(event, session);
            delivered += 1;
        }
        delivered
    }

    fn is_registered(&self, id: u64) -> bool {
        self.listeners
            .lock()
            .iter()
            .any(|(registered, _)| *registered == id)
    }
}

/// Handle returned by `on_auth_state_change`. Dropping it keeps the listener
/// registered; call [`Subscription::unsubscribe`] to stop delivery.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(id: u64, registry: &Arc<ListenerRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    /// Removes the listener. Returns false if it was already removed.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.unsubscribe(self.id))
    }
}
