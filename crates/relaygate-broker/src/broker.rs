use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relaygate_core::{Broker, BrokerError, BrokerFactory, BrokerHandle, BrokerModule};

// ─── Broker ──────────────────────────────────────────────────────

/// Attachment table plus an explicit reference count.
///
/// The count starts at 1 for the creation reference. When it reaches zero
/// the broker is released: the table is cleared and every later attach or
/// detach fails with [`BrokerError::Released`].
#[derive(Debug)]
pub struct InProcessBroker {
    modules: Mutex<Vec<BrokerModule>>,
    refs: AtomicUsize,
}

impl Default for InProcessBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InProcessBroker {
    pub fn new() -> Self {
        Self {
            modules: Mutex::new(Vec::new()),
            refs: AtomicUsize::new(1),
        }
    }

    /// Number of modules currently attached.
    pub fn module_count(&self) -> usize {
        self.table().len()
    }

    /// Outstanding references, including the creation reference.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.ref_count() == 0
    }

    /// Attached modules in attach order.
    pub fn attached(&self) -> Vec<BrokerModule> {
        self.table().clone()
    }

    fn table(&self) -> MutexGuard<'_, Vec<BrokerModule>> {
        // The table holds plain data; a panic elsewhere cannot leave it
        // half-updated.
        self.modules.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut table = self.table();
        if !table.is_empty() {
            tracing::warn!(
                attached = table.len(),
                "broker released with modules still attached"
            );
        }
        table.clear();
        table.shrink_to_fit();
        tracing::debug!("broker released");
    }
}

impl Broker for InProcessBroker {
    fn add_module(&self, module: &BrokerModule) -> Result<(), BrokerError> {
        let mut table = self.table();
        if self.is_released() {
            return Err(BrokerError::Released);
        }
        if table.iter().any(|m| m.id == module.id) {
            return Err(BrokerError::AlreadyAttached(module.id));
        }
        table.push(module.clone());
        tracing::debug!(module = %module.name, id = %module.id, "module attached");
        Ok(())
    }

    fn remove_module(&self, module: &BrokerModule) -> Result<(), BrokerError> {
        let mut table = self.table();
        if self.is_released() {
            return Err(BrokerError::Released);
        }
        let index = table
            .iter()
            .position(|m| m.id == module.id)
            .ok_or(BrokerError::NotAttached(module.id))?;
        table.remove(index);
        tracing::debug!(module = %module.name, id = %module.id, "module detached");
        Ok(())
    }

    fn inc_ref(&self) {
        let bumped = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then(|| n + 1)
            });
        if bumped.is_err() {
            tracing::warn!("inc_ref on a released broker ignored");
        }
    }

    fn dec_ref(&self) {
        match self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => self.release(),
            Ok(_) => {}
            Err(_) => tracing::warn!("dec_ref on a released broker ignored"),
        }
    }
}

// ─── Factory ─────────────────────────────────────────────────────

/// Creates [`InProcessBroker`]s and keeps a handle to the most recent one
/// for auditing. Earlier brokers are released once their gateways drop them.
#[derive(Debug, Default)]
pub struct InProcessBrokerFactory {
    last: Mutex<Option<Arc<InProcessBroker>>>,
}

impl InProcessBrokerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_issued(&self) -> Option<Arc<InProcessBroker>> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BrokerFactory for InProcessBrokerFactory {
    fn create(&self) -> Result<BrokerHandle, BrokerError> {
        let broker = Arc::new(InProcessBroker::new());
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&broker));
        Ok(broker)
    }
}

#[cfg(test)]
mod tests {
    use relaygate_core::ModuleId;

    use super::*;

    fn module(id: u64, name: &str) -> BrokerModule {
        BrokerModule {
            id: ModuleId::new(id),
            name: name.to_owned(),
        }
    }

    // ── Attachment ───────────────────────────────────────────────────

    #[test]
    fn attach_and_detach() {
        let broker = InProcessBroker::new();
        broker.add_module(&module(1, "a")).expect("attach a");
        broker.add_module(&module(2, "b")).expect("attach b");
        assert_eq!(broker.module_count(), 2);

        broker.remove_module(&module(1, "a")).expect("detach a");
        let names: Vec<_> = broker.attached().into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn same_id_cannot_attach_twice() {
        let broker = InProcessBroker::new();
        broker.add_module(&module(1, "a")).expect("attach");
        assert_eq!(
            broker.add_module(&module(1, "a")),
            Err(BrokerError::AlreadyAttached(ModuleId::new(1)))
        );
        assert_eq!(broker.module_count(), 1);
    }

    #[test]
    fn detach_unknown_module_fails() {
        let broker = InProcessBroker::new();
        assert_eq!(
            broker.remove_module(&module(9, "ghost")),
            Err(BrokerError::NotAttached(ModuleId::new(9)))
        );
    }

    // ── Reference counting ───────────────────────────────────────────

    #[test]
    fn starts_with_creation_reference() {
        let broker = InProcessBroker::new();
        assert_eq!(broker.ref_count(), 1);
        broker.inc_ref();
        broker.inc_ref();
        assert_eq!(broker.ref_count(), 3);
        broker.dec_ref();
        assert_eq!(broker.ref_count(), 2);
        assert!(!broker.is_released());
    }

    #[test]
    fn destroy_drops_creation_reference_and_releases() {
        let broker = InProcessBroker::new();
        broker.add_module(&module(1, "a")).expect("attach");
        broker.destroy();
        assert!(broker.is_released());
        assert_eq!(broker.module_count(), 0);
        assert_eq!(
            broker.add_module(&module(2, "b")),
            Err(BrokerError::Released)
        );
        assert_eq!(
            broker.remove_module(&module(1, "a")),
            Err(BrokerError::Released)
        );
    }

    #[test]
    fn released_broker_ignores_further_ref_changes() {
        let broker = InProcessBroker::new();
        broker.dec_ref();
        broker.dec_ref();
        broker.inc_ref();
        assert_eq!(broker.ref_count(), 0);
    }

    #[test]
    fn release_waits_for_last_reference() {
        let broker = InProcessBroker::new();
        broker.inc_ref();
        broker.destroy();
        assert!(!broker.is_released());
        broker.dec_ref();
        assert!(broker.is_released());
    }

    // ── Factory ──────────────────────────────────────────────────────

    #[test]
    fn factory_keeps_audit_handle_to_latest_broker() {
        let factory = InProcessBrokerFactory::new();
        let handle = factory.create().expect("create");
        handle.inc_ref();

        let audit = factory.last_issued().expect("issued");
        assert_eq!(audit.ref_count(), 2);

        handle.dec_ref();
        handle.destroy();
        assert!(audit.is_released());
    }

    #[test]
    fn factory_drops_earlier_brokers() {
        let factory = InProcessBrokerFactory::new();
        let first = factory.create().expect("first");
        let weak = Arc::downgrade(&first);
        drop(first);
        assert!(weak.upgrade().is_some(), "latest broker stays audited");

        let second = factory.create().expect("second");
        assert!(weak.upgrade().is_none());
        let latest = factory.last_issued().expect("issued");
        assert_eq!(
            Arc::as_ptr(&latest).cast::<()>(),
            Arc::as_ptr(&second).cast::<()>()
        );
    }
}
