//! Allocation sizing with a test-only failure switch.
//!
//! Real allocation failure cannot be provoked on demand, so unit tests arm a
//! site and the next requests there ask for an impossible capacity, which
//! drives the genuine `TryReserveError` path. Outside tests every request is
//! passed through unchanged.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Site {
    ModuleRegistry,
    LinkRegistry,
    Snapshot,
}

#[cfg(not(test))]
pub(crate) fn capacity(_site: Site, wanted: usize) -> usize {
    wanted
}

#[cfg(test)]
pub(crate) use armed::{arm, capacity};
