//! relaygate-broker: the default in-process broker.
//!
//! Tracks which modules are attached and how many owners keep the broker
//! alive. Message delivery between attached modules is not implemented
//! here.

pub mod broker;

pub use broker::{InProcessBroker, InProcessBrokerFactory};
