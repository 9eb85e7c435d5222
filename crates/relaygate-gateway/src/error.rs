//! Error types for gateway operations.

use std::collections::TryReserveError;

use relaygate_core::{AddLinkResult, BrokerError, EventError, LinkEntry, LoaderError};
use thiserror::Error;

/// Failure to grow one of the gateway registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry is full ({limit} entries)")]
    Full { limit: usize },

    #[error("registry allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("a module named `{0}` is already attached")]
    DuplicateModule(String),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("module `{name}` failed to instantiate")]
    ModuleCreate { name: String },

    #[error("module `{name}` could not be attached to the broker: {source}")]
    BrokerAttach {
        name: String,
        #[source]
        source: BrokerError,
    },

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("link {link} rejected: {result}")]
    LinkRejected {
        link: LinkEntry,
        result: AddLinkResult,
    },

    #[error(transparent)]
    EventSystem(#[from] EventError),

    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}
