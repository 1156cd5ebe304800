//! Typed multi-subscriber event registry.

use crate::events::{DriverEvent, EventKind, EventNameError};
use std::collections::HashMap;

/// A subscriber callback. Invoked synchronously on the emitting thread.
pub type EventCallback = Box<dyn FnMut(&DriverEvent) + Send>;

/// Dispatches driver events to subscribers keyed by event kind.
///
/// Subscribers for a kind are invoked in registration order. Events with
/// no subscribers are dropped silently.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<EventKind, Vec<EventCallback>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one event kind.
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        self.subscribers
            .entry(kind)
            .or_default()
            .push(Box::new(callback));
    }

    /// Register a callback by event name, e.g. `"node ready"`.
    ///
    /// # Errors
    ///
    /// Returns [`EventNameError`] if the name is not one of the
    /// recognized event phrases.
    pub fn subscribe_named<F>(&mut self, name: &str, callback: F) -> Result<(), EventNameError>
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        let kind: EventKind = name.parse()?;
        self.subscribe(kind, callback);
        Ok(())
    }

    /// Deliver an event to every subscriber of its kind, in order.
    pub fn emit(&mut self, event: &DriverEvent) {
        if let Some(callbacks) = self.subscribers.get_mut(&event.kind()) {
            for callback in callbacks {
                callback(event);
            }
        }
    }

    /// Number of subscribers registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.subscribers.len())
            .finish()
    }
}
