//! relaygate-gateway: the gateway orchestrator.
//!
//! Owns the broker handle, the module and link registries, and the event
//! notifier, and runs every topology change as a transaction against the
//! loader, the modules, and the broker: each step that fails unwinds the
//! steps before it.

mod alloc_fault;
pub mod error;
pub mod event_system;
pub mod gateway;
pub mod link_registry;
pub mod module_registry;
mod undo;

#[cfg(test)]
mod test_support;

pub use error::{GatewayError, RegistryError};
pub use event_system::{EventSystem, EventSystemFactory};
pub use gateway::{Gateway, GatewayDeps, GatewayOptions};
pub use link_registry::LinkRegistry;
pub use module_registry::{ModuleRecord, ModuleRegistry};
pub use relaygate_core::types;
