//! Local observers.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::event::{EventType, LocalEvent};

/// Where the event a listener receives was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    Local,
    /// Rebuilt from another node's envelope
    Remote,
}

/// Reacts to events of the types it declares.
pub trait EventListener: Send + Sync {
    fn name(&self) -> &str;

    fn events(&self) -> Vec<EventType>;

    fn on_event(&self, event: &LocalEvent, origin: EventOrigin);
}

/// Fans events out to the listeners registered on this node.
///
/// The listener list stays in use after a panic poisoned its lock.
#[derive(Default)]
pub struct ObservationManager {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl ObservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn EventListener>>> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn EventListener>>> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let mut listeners = self.listeners_mut();
        log::debug!("Added event listener '{}'", listener.name());
        listeners.push(listener);
    }

    /// Removes every listener called `name`; returns whether one was found.
    pub fn remove_listener(&self, name: &str) -> bool {
        let mut listeners = self.listeners_mut();
        let before = listeners.len();
        listeners.retain(|l| l.name() != name);
        before != listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Delivers `event` to matching listeners; returns how many were called.
    pub fn notify(&self, event: &LocalEvent, origin: EventOrigin) -> usize {
        // Snapshot so listeners may register others while being notified.
        let listeners: Vec<Arc<dyn EventListener>> = self.listeners().clone();

        let mut notified = 0;
        for listener in listeners {
            if listener.events().contains(&event.event) {
                listener.on_event(event, origin);
                notified += 1;
            }
        }
        log::trace!("{} {:?} event delivered to {notified} listeners", event.event, origin);
        notified
    }
}
