//! Default synchronous event notifier.
//!
//! Callbacks are kept per event kind and invoked on the reporting thread in
//! registration order.

use std::collections::HashMap;
use std::fmt;

use relaygate_core::{
    EventCallback, EventContext, EventError, EventNotifier, EventNotifierFactory, GatewayEvent,
};

#[derive(Default)]
pub struct EventSystem {
    callbacks: HashMap<GatewayEvent, Vec<EventCallback>>,
}

impl EventSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback_count(&self, event: GatewayEvent) -> usize {
        self.callbacks.get(&event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .callbacks
            .iter()
            .map(|(event, cbs)| (event.as_str(), cbs.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventSystem")
            .field("callbacks", &counts)
            .finish()
    }
}

impl EventNotifier for EventSystem {
    fn add_callback(&mut self, event: GatewayEvent, callback: EventCallback) {
        self.callbacks.entry(event).or_default().push(callback);
    }

    fn report(&mut self, event: GatewayEvent, context: &EventContext) {
        let Some(callbacks) = self.callbacks.get(&event) else {
            tracing::trace!(%event, "no callbacks registered");
            return;
        };
        for callback in callbacks {
            callback(event, context);
        }
    }

    fn destroy(self: Box<Self>) {
        tracing::debug!(?self, "event system destroyed");
    }
}

/// Builds a fresh [`EventSystem`] for every gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventSystemFactory;

impl EventNotifierFactory for EventSystemFactory {
    fn init(&self) -> Result<Box<dyn EventNotifier>, EventError> {
        Ok(Box::new(EventSystem::new()))
    }
}
