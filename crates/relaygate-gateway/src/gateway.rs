//! The gateway orchestrator.
//!
//! Every operation is synchronous and runs on the caller's thread. The
//! caller serializes access to one gateway; `&mut self` enforces that.
//!
//! Broker reference accounting: the gateway holds the broker's creation
//! reference plus one reference per attached module. Each successful
//! attach calls `inc_ref` exactly once and each detach (standalone or
//! during teardown) calls `dec_ref` exactly once, whether or not the
//! broker accepted the detach.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use relaygate_core::{
    AddLinkResult, BrokerFactory, BrokerHandle, BrokerModule, EventCallback, EventContext,
    EventNotifier, EventNotifierFactory, GatewayEvent, GatewayProperties, LibraryHandle,
    LinkEntry, ModuleEntry, ModuleId, ModuleInfo, ModuleInstance, ModuleLoader,
};

use crate::error::GatewayError;
use crate::link_registry::LinkRegistry;
use crate::module_registry::{ModuleRecord, ModuleRegistry};
use crate::undo::UndoStack;

// ─── Collaborators ───────────────────────────────────────────────

/// The external capabilities a gateway is built from.
#[derive(Clone)]
pub struct GatewayDeps {
    pub loader: Arc<dyn ModuleLoader>,
    pub brokers: Arc<dyn BrokerFactory>,
    pub events: Arc<dyn EventNotifierFactory>,
}

impl GatewayDeps {
    pub fn new(
        loader: Arc<dyn ModuleLoader>,
        brokers: Arc<dyn BrokerFactory>,
        events: Arc<dyn EventNotifierFactory>,
    ) -> Self {
        Self {
            loader,
            brokers,
            events,
        }
    }
}

impl fmt::Debug for GatewayDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayDeps").finish_non_exhaustive()
    }
}

/// Capacity limits for the registries, enforced on every append including
/// the ones `create` makes while seeding. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayOptions {
    pub max_modules: Option<usize>,
    pub max_links: Option<usize>,
}

// ─── Staging targets ─────────────────────────────────────────────

/// Resources acquired by `create` before the gateway exists.
#[derive(Default)]
struct StagedGateway {
    broker: Option<BrokerHandle>,
    modules: Option<ModuleRegistry>,
}

/// Resources acquired by `add_module` before the record is appended.
struct StagedModule {
    library: Option<LibraryHandle>,
    instance: Option<ModuleInstance>,
}

// ─── Gateway ─────────────────────────────────────────────────────

pub struct Gateway {
    loader: Arc<dyn ModuleLoader>,
    broker: BrokerHandle,
    modules: ModuleRegistry,
    links: LinkRegistry,
    events: Option<Box<dyn EventNotifier>>,
    next_module_id: u64,
    torn_down: bool,
}

impl Gateway {
    /// Build a gateway and seed it from `properties`.
    ///
    /// Either every declared module and link is in place when this returns
    /// `Ok`, or everything acquired so far has been released.
    pub fn create(
        deps: GatewayDeps,
        properties: Option<&GatewayProperties>,
    ) -> Result<Self, GatewayError> {
        Self::create_with_options(deps, properties, GatewayOptions::default())
    }

    pub fn create_with_options(
        deps: GatewayDeps,
        properties: Option<&GatewayProperties>,
        options: GatewayOptions,
    ) -> Result<Self, GatewayError> {
        let GatewayDeps {
            loader,
            brokers,
            events,
        } = deps;
        let declared_modules = properties.map_or(0, |p| p.modules.len());
        let declared_links = properties.map_or(0, |p| p.links.len());

        let broker = brokers.create().inspect_err(|e| {
            tracing::warn!("gateway create: broker creation failed: {e}");
        })?;

        let mut staged = StagedGateway::default();
        let mut undo: UndoStack<'_, StagedGateway> = UndoStack::new();
        staged.broker = Some(broker);
        undo.push("destroy broker", |s| {
            if let Some(broker) = s.broker.take() {
                broker.destroy();
            }
        });

        match ModuleRegistry::try_with_capacity(declared_modules, options.max_modules) {
            Ok(modules) => staged.modules = Some(modules),
            Err(e) => {
                tracing::warn!("gateway create: module registry allocation failed: {e}");
                undo.unwind(&mut staged);
                return Err(e.into());
            }
        }
        undo.push("release module registry", |s| s.modules = None);

        let links = match LinkRegistry::try_with_capacity(declared_links, options.max_links) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("gateway create: link registry allocation failed: {e}");
                undo.unwind(&mut staged);
                return Err(e.into());
            }
        };
        undo.commit();

        let StagedGateway {
            broker: Some(broker),
            modules: Some(modules),
        } = staged
        else {
            return Err(GatewayError::Internal("gateway staging lost a resource"));
        };

        // From here on the gateway owns everything; failures tear it down.
        let mut gateway = Self {
            loader,
            broker,
            modules,
            links,
            events: None,
            next_module_id: 1,
            torn_down: false,
        };

        if let Some(properties) = properties {
            for entry in &properties.modules {
                if let Err(e) = gateway.add_module(entry) {
                    tracing::warn!(module = %entry.name, "gateway create: {e}");
                    gateway.teardown();
                    return Err(e);
                }
            }
            for link in &properties.links {
                let result = gateway.add_link(link);
                if !result.is_success() {
                    tracing::warn!(%link, %result, "gateway create: link rejected");
                    gateway.teardown();
                    return Err(GatewayError::LinkRejected {
                        link: link.clone(),
                        result,
                    });
                }
            }
        }

        match events.init() {
            Ok(notifier) => gateway.events = Some(notifier),
            Err(e) => {
                tracing::warn!("gateway create: event system init failed: {e}");
                gateway.teardown();
                return Err(e.into());
            }
        }

        gateway.report(GatewayEvent::Created);
        gateway.report(GatewayEvent::ModuleListChanged);
        tracing::info!(
            modules = gateway.modules.len(),
            links = gateway.links.len(),
            "gateway created"
        );
        Ok(gateway)
    }

    /// Report `Destroyed`, detach and release every module, drop every
    /// link, and release the broker.
    pub fn destroy(mut self) {
        self.teardown();
    }

    // ── Modules ──────────────────────────────────────────────────

    /// Load, instantiate and attach one module.
    ///
    /// On failure every step already taken is undone in reverse order and
    /// the gateway is left as it was.
    pub fn add_module(&mut self, entry: &ModuleEntry) -> Result<ModuleId, GatewayError> {
        if entry.name.is_empty() {
            return Err(GatewayError::InvalidArgument("module name is empty"));
        }
        let path = match entry.module_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err(GatewayError::InvalidArgument("module path is missing")),
        };
        if self.modules.contains_name(&entry.name) {
            return Err(GatewayError::DuplicateModule(entry.name.clone()));
        }

        let id = self.attach(entry, path)?;
        tracing::debug!(module = %entry.name, %id, "module added");
        self.report(GatewayEvent::ModuleListChanged);
        Ok(id)
    }

    fn attach(&mut self, entry: &ModuleEntry, path: &Path) -> Result<ModuleId, GatewayError> {
        let library = self.loader.load(path)?;
        let api = match self.loader.module_apis(&library) {
            Ok(api) => api,
            Err(e) => {
                self.loader.unload(library);
                return Err(e.into());
            }
        };

        let mut staged = StagedModule {
            library: Some(library),
            instance: None,
        };
        let mut undo: UndoStack<'_, StagedModule> = UndoStack::new();
        let loader = Arc::clone(&self.loader);
        undo.push("unload library", move |s| {
            if let Some(library) = s.library.take() {
                loader.unload(library);
            }
        });

        let Some(instance) = api.create(&self.broker, entry.args.as_ref()) else {
            undo.unwind(&mut staged);
            return Err(GatewayError::ModuleCreate {
                name: entry.name.clone(),
            });
        };
        staged.instance = Some(instance);
        let destroy_api = Arc::clone(&api);
        undo.push("destroy instance", move |s| {
            if let Some(instance) = s.instance.take() {
                destroy_api.destroy(instance);
            }
        });

        let id = ModuleId::new(self.next_module_id);
        let module = BrokerModule {
            id,
            name: entry.name.clone(),
        };
        if let Err(source) = self.broker.add_module(&module) {
            undo.unwind(&mut staged);
            return Err(GatewayError::BrokerAttach {
                name: entry.name.clone(),
                source,
            });
        }
        self.broker.inc_ref();
        let broker = Arc::clone(&self.broker);
        undo.push("detach from broker", move |_| detach(&broker, &module));

        if let Err(e) = self.modules.try_reserve(1) {
            undo.unwind(&mut staged);
            return Err(e.into());
        }
        undo.commit();

        let StagedModule {
            library: Some(library),
            instance: Some(instance),
        } = staged
        else {
            return Err(GatewayError::Internal("module staging lost a resource"));
        };
        self.modules.push(ModuleRecord::new(
            id,
            entry.name.clone(),
            library,
            api,
            instance,
        ));
        self.next_module_id += 1;
        Ok(id)
    }

    /// Detach and release the module with identity `id`. Unknown
    /// identities are ignored.
    pub fn remove_module(&mut self, id: ModuleId) {
        let Some(record) = self.modules.remove(id) else {
            tracing::debug!(%id, "remove_module: no such module");
            return;
        };
        let name = record.name().to_owned();
        self.release(record);
        tracing::debug!(module = %name, %id, "module removed");
        self.report(GatewayEvent::ModuleListChanged);
    }

    /// Detach (best effort), drop the module's broker reference, destroy
    /// the instance and unload its library.
    fn release(&self, record: ModuleRecord) {
        detach(&self.broker, &record.broker_module());
        let ModuleRecord {
            library,
            api,
            instance,
            ..
        } = record;
        api.destroy(instance);
        self.loader.unload(library);
    }

    // ── Links ────────────────────────────────────────────────────

    pub fn add_link(&mut self, link: &LinkEntry) -> AddLinkResult {
        let modules = &self.modules;
        let result = self.links.validate(link, |name| modules.contains_name(name));
        if !result.is_success() {
            tracing::debug!(%link, %result, "link rejected");
            return result;
        }
        if let Err(e) = self.links.try_push(link.clone()) {
            tracing::warn!(%link, "link registry append failed: {e}");
            return AddLinkResult::Error;
        }
        tracing::debug!(%link, "link added");
        AddLinkResult::Success
    }

    pub fn remove_link(&mut self, link: &LinkEntry) {
        if self.links.remove(link) {
            tracing::debug!(%link, "link removed");
        } else {
            tracing::debug!(%link, "remove_link: no such link");
        }
    }

    // ── Queries & events ─────────────────────────────────────────

    /// Independent copy of the attached module names, in attach order.
    /// `None` if the copy could not be allocated.
    pub fn module_list(&self) -> Option<Vec<ModuleInfo>> {
        self.modules.snapshot()
    }

    pub fn add_event_callback(&mut self, event: GatewayEvent, callback: EventCallback) {
        match self.events.as_mut() {
            Some(events) => events.add_callback(event, callback),
            None => tracing::warn!(%event, "add_event_callback: gateway has no event system"),
        }
    }

    pub fn broker(&self) -> &BrokerHandle {
        &self.broker
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn links(&self) -> &LinkRegistry {
        &self.links
    }

    fn report(&mut self, event: GatewayEvent) {
        let Some(events) = self.events.as_mut() else {
            return;
        };
        let mut context = EventContext::new(event, Utc::now());
        if event == GatewayEvent::ModuleListChanged {
            context.modules = self.modules.snapshot();
        }
        events.report(event, &context);
    }

    /// Release everything the gateway owns. Safe on a partially seeded
    /// gateway and safe to call more than once.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(mut events) = self.events.take() {
            events.report(
                GatewayEvent::Destroyed,
                &EventContext::new(GatewayEvent::Destroyed, Utc::now()),
            );
            events.destroy();
        }

        let modules = self.modules.len();
        while let Some(record) = self.modules.pop_front() {
            self.release(record);
        }
        while self.links.pop_front().is_some() {}
        self.modules.release_storage();
        self.links.release_storage();

        self.broker.destroy();
        tracing::info!(modules, "gateway destroyed");
    }
}

/// Broker half of module removal: a failed detach is logged and the
/// module's reference is dropped regardless.
fn detach(broker: &BrokerHandle, module: &BrokerModule) {
    if let Err(e) = broker.remove_module(module) {
        tracing::warn!(module = %module.name, id = %module.id, "broker detach failed: {e}");
    }
    broker.dec_ref();
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("modules", &self.modules)
            .field("links", &self.links)
            .field("next_module_id", &self.next_module_id)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}
