//! Ordered registry of directed links between module names.
//!
//! Links are routing intent only. They hold module names by value and are
//! not re-validated when a module is later removed.

use std::collections::VecDeque;

use relaygate_core::{AddLinkResult, LinkEntry};

use crate::alloc_fault::{self, Site};
use crate::error::RegistryError;

#[derive(Debug, Default)]
pub struct LinkRegistry {
    links: VecDeque<LinkEntry>,
    /// Maximum number of links, `None` for unbounded.
    limit: Option<usize>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            links: VecDeque::new(),
            limit,
        }
    }

    /// An empty registry with storage for `capacity` links allocated up
    /// front. The limit is enforced when links are appended.
    pub fn try_with_capacity(
        capacity: usize,
        limit: Option<usize>,
    ) -> Result<Self, RegistryError> {
        let capacity = limit.map_or(capacity, |limit| capacity.min(limit));
        let mut links = VecDeque::new();
        links.try_reserve(alloc_fault::capacity(Site::LinkRegistry, capacity))?;
        Ok(Self { links, limit })
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkEntry> {
        self.links.iter()
    }

    pub fn contains(&self, link: &LinkEntry) -> bool {
        self.links
            .iter()
            .any(|l| l.source == link.source && l.sink == link.sink)
    }

    /// Decide whether `link` may be added.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// 1. source and sink are non-empty (`InvalidArg`),
    /// 2. the pair is not already present (`Error`),
    /// 3. `module_exists(source)` (`Error`),
    /// 4. `module_exists(sink)` (`Error`).
    pub fn validate(
        &self,
        link: &LinkEntry,
        mut module_exists: impl FnMut(&str) -> bool,
    ) -> AddLinkResult {
        if link.source.is_empty() || link.sink.is_empty() {
            return AddLinkResult::InvalidArg;
        }
        if self.contains(link) {
            return AddLinkResult::Error;
        }
        if !module_exists(&link.source) {
            return AddLinkResult::Error;
        }
        if !module_exists(&link.sink) {
            return AddLinkResult::Error;
        }
        AddLinkResult::Success
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<(), RegistryError> {
        if let Some(limit) = self.limit {
            if self.links.len().saturating_add(additional) > limit {
                return Err(RegistryError::Full { limit });
            }
        }
        self.links.try_reserve(additional)?;
        Ok(())
    }

    /// Append a link that has already passed [`Self::validate`].
    pub(crate) fn try_push(&mut self, link: LinkEntry) -> Result<(), RegistryError> {
        self.try_reserve(1)?;
        self.links.push_back(link);
        Ok(())
    }

    /// Remove the link with the same (source, sink) pair. Returns whether a
    /// link was removed.
    pub(crate) fn remove(&mut self, link: &LinkEntry) -> bool {
        match self
            .links
            .iter()
            .position(|l| l.source == link.source && l.sink == link.sink)
        {
            Some(index) => {
                self.links.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<LinkEntry> {
        self.links.pop_front()
    }

    pub(crate) fn release_storage(&mut self) {
        debug_assert!(self.links.is_empty());
        self.links = VecDeque::new();
    }
}
