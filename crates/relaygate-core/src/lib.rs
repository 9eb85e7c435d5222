//! relaygate-core: shared vocabulary for the relaygate module host.
//!
//! Holds the descriptors callers hand to the gateway, the event and
//! snapshot types it hands back, and the traits for the three external
//! collaborators the gateway drives: module loader, broker, and event
//! notifier. No business logic lives here.

pub mod broker;
pub mod error;
pub mod event;
pub mod message;
pub mod module;
pub mod types;

pub use broker::{Broker, BrokerFactory, BrokerHandle, BrokerModule};
pub use error::{BrokerError, EventError, LoaderError};
pub use event::{EventCallback, EventContext, EventNotifier, EventNotifierFactory, GatewayEvent};
pub use message::Message;
pub use module::{LibraryHandle, ModuleApi, ModuleInstance, ModuleLoader};
pub use types::{AddLinkResult, GatewayProperties, LinkEntry, ModuleEntry, ModuleId, ModuleInfo};
