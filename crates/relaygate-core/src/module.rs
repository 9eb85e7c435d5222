//! Module loader and module function-table contracts.
//!
//! A [`ModuleLoader`] turns a library path into an opaque [`LibraryHandle`]
//! and extracts the library's [`ModuleApi`] table. The table creates,
//! destroys, and feeds messages to [`ModuleInstance`]s. The gateway owns
//! both the handle and the instance for as long as the module is attached.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::broker::BrokerHandle;
use crate::error::LoaderError;
use crate::message::Message;

// ─── Library handle ──────────────────────────────────────────────

/// Opaque handle to a loaded module library.
///
/// The payload is private to the loader that produced it; loaders recover
/// it with [`LibraryHandle::downcast_ref`].
pub struct LibraryHandle {
    path: PathBuf,
    payload: Box<dyn Any + Send + Sync>,
}

impl LibraryHandle {
    pub fn new<T: Any + Send + Sync>(path: impl Into<PathBuf>, payload: T) -> Self {
        Self {
            path: path.into(),
            payload: Box::new(payload),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for LibraryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ─── Module instance ─────────────────────────────────────────────

/// Opaque state of one instantiated module, owned by the gateway.
pub struct ModuleInstance(Box<dyn Any + Send>);

impl ModuleInstance {
    pub fn new<T: Any + Send>(state: T) -> Self {
        Self(Box::new(state))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Recover the concrete state, handing the instance back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, Self> {
        self.0.downcast::<T>().map_err(Self)
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModuleInstance(..)")
    }
}

// ─── Contracts ───────────────────────────────────────────────────

/// Function table exported by a module library.
pub trait ModuleApi: Send + Sync {
    /// Instantiate the module against `broker`. `None` signals failure.
    fn create(
        &self,
        broker: &BrokerHandle,
        config: Option<&serde_json::Value>,
    ) -> Option<ModuleInstance>;

    /// Tear down an instance previously returned by [`ModuleApi::create`].
    fn destroy(&self, instance: ModuleInstance);

    /// Deliver a message. Invoked by the broker, never by the gateway.
    fn receive(&self, instance: &ModuleInstance, message: &Message);
}

/// Loads module libraries and exposes their function tables.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<LibraryHandle, LoaderError>;

    fn module_apis(&self, library: &LibraryHandle) -> Result<Arc<dyn ModuleApi>, LoaderError>;

    fn unload(&self, library: LibraryHandle);
}
