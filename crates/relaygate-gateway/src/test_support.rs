//! Recording fakes of every gateway collaborator.
//!
//! One [`Harness`] plays loader, broker factory and event-notifier factory.
//! Every collaborator call is appended to a shared log, and individual
//! steps can be armed to fail.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use relaygate_core::{
    Broker, BrokerError, BrokerFactory, BrokerHandle, BrokerModule, EventCallback, EventContext,
    EventError, EventNotifier, EventNotifierFactory, GatewayEvent, LibraryHandle, LoaderError,
    Message, ModuleApi, ModuleInstance, ModuleLoader,
};

use crate::event_system::EventSystem;
use crate::gateway::GatewayDeps;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Load(String),
    ModuleApis(String),
    Unload(String),
    ModuleCreate(String),
    ModuleDestroy(String),
    BrokerCreate,
    BrokerAdd(String),
    BrokerRemove(String),
    IncRef,
    DecRef,
    BrokerDestroy,
    EventsInit,
    AddCallback(GatewayEvent),
    Report(GatewayEvent),
    EventsDestroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Fail {
    Load,
    ModuleApis,
    BrokerCreate,
    BrokerAdd,
    BrokerRemove,
    EventsInit,
}

#[derive(Default)]
struct State {
    calls: Mutex<Vec<Call>>,
    armed: Mutex<HashSet<Fail>>,
    attached: Mutex<Vec<BrokerModule>>,
    refs: AtomicI64,
}

/// Cheap handle onto shared fake state; every fake holds a clone.
#[derive(Clone, Default)]
pub(crate) struct Harness(Arc<State>);

impl Harness {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn deps(&self) -> GatewayDeps {
        GatewayDeps::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    pub(crate) fn fail(&self, step: Fail) {
        self.0.armed.lock().expect("armed lock").insert(step);
    }

    pub(crate) fn heal(&self, step: Fail) {
        self.0.armed.lock().expect("armed lock").remove(&step);
    }

    fn armed(&self, step: Fail) -> bool {
        self.0.armed.lock().expect("armed lock").contains(&step)
    }

    fn record(&self, call: Call) {
        self.0.calls.lock().expect("calls lock").push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.0.calls.lock().expect("calls lock").clear();
    }

    /// Recorded calls matching `pred`, in order.
    pub(crate) fn calls_where(&self, pred: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls().into_iter().filter(|c| pred(c)).collect()
    }

    pub(crate) fn reports(&self) -> Vec<GatewayEvent> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Report(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn attached(&self) -> Vec<String> {
        self.0
            .attached
            .lock()
            .expect("attached lock")
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub(crate) fn refs(&self) -> i64 {
        self.0.refs.load(Ordering::SeqCst)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

// ── Loader ───────────────────────────────────────────────────────────

impl ModuleLoader for Harness {
    fn load(&self, path: &Path) -> Result<LibraryHandle, LoaderError> {
        self.record(Call::Load(display(path)));
        if self.armed(Fail::Load) {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }
        Ok(LibraryHandle::new(path, path.to_path_buf()))
    }

    fn module_apis(&self, library: &LibraryHandle) -> Result<Arc<dyn ModuleApi>, LoaderError> {
        self.record(Call::ModuleApis(display(library.path())));
        if self.armed(Fail::ModuleApis) {
            return Err(LoaderError::InvalidApiTable {
                path: library.path().to_path_buf(),
                detail: "armed failure".to_owned(),
            });
        }
        let path = library
            .downcast_ref::<PathBuf>()
            .ok_or_else(|| LoaderError::ForeignHandle(library.path().to_path_buf()))?;
        Ok(Arc::new(FakeApi {
            harness: self.clone(),
            path: display(path),
        }))
    }

    fn unload(&self, library: LibraryHandle) {
        self.record(Call::Unload(display(library.path())));
    }
}

// ── Module API ───────────────────────────────────────────────────────

/// Modules whose configuration is `false` refuse to instantiate.
struct FakeApi {
    harness: Harness,
    path: String,
}

impl ModuleApi for FakeApi {
    fn create(
        &self,
        _broker: &BrokerHandle,
        config: Option<&serde_json::Value>,
    ) -> Option<ModuleInstance> {
        self.harness.record(Call::ModuleCreate(self.path.clone()));
        if config == Some(&serde_json::Value::Bool(false)) {
            return None;
        }
        Some(ModuleInstance::new(self.path.clone()))
    }

    fn destroy(&self, instance: ModuleInstance) {
        let path = instance
            .downcast::<String>()
            .map(|p| *p)
            .unwrap_or_else(|_| "<foreign>".to_owned());
        self.harness.record(Call::ModuleDestroy(path));
    }

    fn receive(&self, _instance: &ModuleInstance, _message: &Message) {}
}

// ── Broker ───────────────────────────────────────────────────────────

struct FakeBroker {
    harness: Harness,
}

impl Broker for FakeBroker {
    fn add_module(&self, module: &BrokerModule) -> Result<(), BrokerError> {
        let harness = &self.harness;
        harness.record(Call::BrokerAdd(module.name.clone()));
        if harness.armed(Fail::BrokerAdd) {
            return Err(BrokerError::Create("armed failure".to_owned()));
        }
        harness
            .0
            .attached
            .lock()
            .expect("attached lock")
            .push(module.clone());
        Ok(())
    }

    fn remove_module(&self, module: &BrokerModule) -> Result<(), BrokerError> {
        let harness = &self.harness;
        harness.record(Call::BrokerRemove(module.name.clone()));
        if harness.armed(Fail::BrokerRemove) {
            return Err(BrokerError::NotAttached(module.id));
        }
        harness
            .0
            .attached
            .lock()
            .expect("attached lock")
            .retain(|m| m.id != module.id);
        Ok(())
    }

    fn inc_ref(&self) {
        let harness = &self.harness;
        harness.record(Call::IncRef);
        harness.0.refs.fetch_add(1, Ordering::SeqCst);
    }

    fn dec_ref(&self) {
        let harness = &self.harness;
        harness.record(Call::DecRef);
        harness.0.refs.fetch_sub(1, Ordering::SeqCst);
    }

    fn destroy(&self) {
        let harness = &self.harness;
        harness.record(Call::BrokerDestroy);
        harness.0.refs.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BrokerFactory for Harness {
    fn create(&self) -> Result<BrokerHandle, BrokerError> {
        self.record(Call::BrokerCreate);
        if self.armed(Fail::BrokerCreate) {
            return Err(BrokerError::Create("armed failure".to_owned()));
        }
        self.0.refs.store(1, Ordering::SeqCst);
        Ok(Arc::new(FakeBroker {
            harness: self.clone(),
        }))
    }
}

// ── Event notifier ───────────────────────────────────────────────────

/// Records every notifier call and forwards to a real [`EventSystem`] so
/// registered callbacks still fire.
struct FakeEvents {
    harness: Harness,
    inner: EventSystem,
}

impl EventNotifier for FakeEvents {
    fn add_callback(&mut self, event: GatewayEvent, callback: EventCallback) {
        self.harness.record(Call::AddCallback(event));
        self.inner.add_callback(event, callback);
    }

    fn report(&mut self, event: GatewayEvent, context: &EventContext) {
        self.harness.record(Call::Report(event));
        self.inner.report(event, context);
    }

    fn destroy(self: Box<Self>) {
        self.harness.record(Call::EventsDestroy);
    }
}

impl EventNotifierFactory for Harness {
    fn init(&self) -> Result<Box<dyn EventNotifier>, EventError> {
        self.record(Call::EventsInit);
        if self.armed(Fail::EventsInit) {
            return Err(EventError::Init("armed failure".to_owned()));
        }
        Ok(Box::new(FakeEvents {
            harness: self.clone(),
            inner: EventSystem::new(),
        }))
    }
}
