//! Gateway lifecycle events and the notifier contract.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventError;
use crate::types::ModuleInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEvent {
    Created,
    Destroyed,
    ModuleListChanged,
}

impl GatewayEvent {
    pub const ALL: [Self; 3] = [Self::Created, Self::Destroyed, Self::ModuleListChanged];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Destroyed => "destroyed",
            Self::ModuleListChanged => "module_list_changed",
        }
    }
}

impl fmt::Display for GatewayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered alongside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    pub event: GatewayEvent,
    pub reported_at: DateTime<Utc>,
    /// Module-list snapshot; present only for `ModuleListChanged`.
    pub modules: Option<Vec<ModuleInfo>>,
}

impl EventContext {
    pub fn new(event: GatewayEvent, reported_at: DateTime<Utc>) -> Self {
        Self {
            event,
            reported_at,
            modules: None,
        }
    }

    #[must_use]
    pub fn with_modules(mut self, modules: Vec<ModuleInfo>) -> Self {
        self.modules = Some(modules);
        self
    }
}

pub type EventCallback = Arc<dyn Fn(GatewayEvent, &EventContext) + Send + Sync>;

/// Stores callbacks per event kind and fires them on report.
pub trait EventNotifier: Send {
    fn add_callback(&mut self, event: GatewayEvent, callback: EventCallback);

    fn report(&mut self, event: GatewayEvent, context: &EventContext);

    fn destroy(self: Box<Self>) {}
}

pub trait EventNotifierFactory: Send + Sync {
    fn init(&self) -> Result<Box<dyn EventNotifier>, EventError>;
}
