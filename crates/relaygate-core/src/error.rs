//! Error types reported by the gateway's external collaborators.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ModuleId;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to load module library {path}: {detail}")]
    Load { path: PathBuf, detail: String },

    #[error("no module registered under {0}")]
    NotFound(PathBuf),

    #[error("module library {path} does not export {symbol}")]
    MissingEntryPoint { path: PathBuf, symbol: String },

    #[error("module library {path} exposes an invalid api table: {detail}")]
    InvalidApiTable { path: PathBuf, detail: String },

    #[error("library handle for {0} was not produced by this loader")]
    ForeignHandle(PathBuf),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker could not be created: {0}")]
    Create(String),

    #[error("broker has been released")]
    Released,

    #[error("{0} is already attached to the broker")]
    AlreadyAttached(ModuleId),

    #[error("{0} is not attached to the broker")]
    NotAttached(ModuleId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event notifier could not be initialized: {0}")]
    Init(String),
}
