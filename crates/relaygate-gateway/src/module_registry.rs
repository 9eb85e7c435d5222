//! Ordered registry of the modules attached to a gateway.
//!
//! A record is present exactly while its instance is attached to the
//! broker. Order is insertion order; teardown walks it front to back.

use std::collections::{TryReserveError, VecDeque};
use std::fmt;
use std::sync::Arc;

use relaygate_core::{BrokerModule, LibraryHandle, ModuleApi, ModuleId, ModuleInfo, ModuleInstance};

use crate::alloc_fault::{self, Site};
use crate::error::RegistryError;

// ─── Module record ───────────────────────────────────────────────

/// One attached module: its library, its live instance, and the function
/// table used to destroy that instance.
pub struct ModuleRecord {
    id: ModuleId,
    name: String,
    pub(crate) library: LibraryHandle,
    pub(crate) api: Arc<dyn ModuleApi>,
    pub(crate) instance: ModuleInstance,
}

impl ModuleRecord {
    pub(crate) fn new(
        id: ModuleId,
        name: String,
        library: LibraryHandle,
        api: Arc<dyn ModuleApi>,
        instance: ModuleInstance,
    ) -> Self {
        Self {
            id,
            name,
            library,
            api,
            instance,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn library(&self) -> &LibraryHandle {
        &self.library
    }

    pub fn instance(&self) -> &ModuleInstance {
        &self.instance
    }

    /// The identity this module is attached to the broker under.
    pub fn broker_module(&self) -> BrokerModule {
        BrokerModule {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for ModuleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

// ─── Registry ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    records: VecDeque<ModuleRecord>,
    /// Maximum number of records, `None` for unbounded.
    limit: Option<usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            records: VecDeque::new(),
            limit,
        }
    }

    /// An empty registry with storage for `capacity` records allocated up
    /// front. The limit is enforced when records are appended, not here.
    pub fn try_with_capacity(
        capacity: usize,
        limit: Option<usize>,
    ) -> Result<Self, RegistryError> {
        let capacity = limit.map_or(capacity, |limit| capacity.min(limit));
        let mut records = VecDeque::new();
        records.try_reserve(alloc_fault::capacity(Site::ModuleRegistry, capacity))?;
        Ok(Self { records, limit })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.iter()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ModuleRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Make room for `additional` records without allocating later.
    ///
    /// Fails when the registry limit would be exceeded or the allocator
    /// refuses the request.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), RegistryError> {
        if let Some(limit) = self.limit {
            if self.records.len().saturating_add(additional) > limit {
                return Err(RegistryError::Full { limit });
            }
        }
        self.records.try_reserve(additional)?;
        Ok(())
    }

    /// Append a record. Call [`Self::try_reserve`] first so the push
    /// cannot fail.
    pub(crate) fn push(&mut self, record: ModuleRecord) {
        self.records.push_back(record);
    }

    /// Remove and return the record with the given identity, preserving
    /// the order of the rest.
    pub(crate) fn remove(&mut self, id: ModuleId) -> Option<ModuleRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        self.records.remove(index)
    }

    pub(crate) fn pop_front(&mut self) -> Option<ModuleRecord> {
        self.records.pop_front()
    }

    /// Release the registry's storage. The registry must already be empty.
    pub(crate) fn release_storage(&mut self) {
        debug_assert!(self.records.is_empty());
        self.records = VecDeque::new();
    }

    /// Independent copy of the current module names, in registry order.
    ///
    /// Returns `None` if the copy cannot be allocated; no partial snapshot
    /// is ever returned.
    pub fn snapshot(&self) -> Option<Vec<ModuleInfo>> {
        match self.try_snapshot() {
            Ok(modules) => Some(modules),
            Err(e) => {
                tracing::warn!("module list snapshot failed: {e}");
                None
            }
        }
    }

    /// Fallible variant used by snapshot callers that need the reason.
    pub fn try_snapshot(&self) -> Result<Vec<ModuleInfo>, TryReserveError> {
        let mut out: Vec<ModuleInfo> = Vec::new();
        let wanted = alloc_fault::capacity(Site::Snapshot, self.records.len());
        out.try_reserve_exact(wanted)?;
        out.extend(self.records.iter().map(|r| ModuleInfo {
            name: r.name.clone(),
        }));
        Ok(out)
    }
}
