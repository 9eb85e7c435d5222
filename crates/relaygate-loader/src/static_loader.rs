use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use relaygate_core::{LibraryHandle, LoaderError, ModuleApi, ModuleLoader};

/// Payload of handles issued by a [`StaticLoader`].
struct StaticLibrary(Arc<dyn ModuleApi>);

/// Serves module tables compiled into the host, keyed by a path-like name
/// such as `builtin/logger`.
#[derive(Default)]
pub struct StaticLoader {
    modules: HashMap<PathBuf, Arc<dyn ModuleApi>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `api` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<PathBuf>, api: Arc<dyn ModuleApi>) {
        let name = name.into();
        if self.modules.insert(name.clone(), api).is_some() {
            tracing::debug!(name = %name.display(), "static module replaced");
        }
    }

    #[must_use]
    pub fn with_module(mut self, name: impl Into<PathBuf>, api: Arc<dyn ModuleApi>) -> Self {
        self.register(name, api);
        self
    }

    pub fn contains(&self, name: &Path) -> bool {
        self.modules.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Path> {
        self.modules.keys().map(PathBuf::as_path)
    }

    /// Whether `library` was issued by a static loader.
    pub(crate) fn owns(library: &LibraryHandle) -> bool {
        library.downcast_ref::<StaticLibrary>().is_some()
    }
}

impl std::fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.modules.keys().collect();
        names.sort();
        f.debug_struct("StaticLoader").field("modules", &names).finish()
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, path: &Path) -> Result<LibraryHandle, LoaderError> {
        let api = self
            .modules
            .get(path)
            .ok_or_else(|| LoaderError::NotFound(path.to_path_buf()))?;
        Ok(LibraryHandle::new(path, StaticLibrary(Arc::clone(api))))
    }

    fn module_apis(&self, library: &LibraryHandle) -> Result<Arc<dyn ModuleApi>, LoaderError> {
        library
            .downcast_ref::<StaticLibrary>()
            .map(|lib| Arc::clone(&lib.0))
            .ok_or_else(|| LoaderError::ForeignHandle(library.path().to_path_buf()))
    }

    fn unload(&self, library: LibraryHandle) {
        drop(library);
    }
}

#[cfg(test)]
mod tests {
    use relaygate_core::{BrokerHandle, Message, ModuleInstance};

    use super::*;

    struct Echo;

    impl ModuleApi for Echo {
        fn create(
            &self,
            _broker: &BrokerHandle,
            config: Option<&serde_json::Value>,
        ) -> Option<ModuleInstance> {
            Some(ModuleInstance::new(config.cloned()))
        }

        fn destroy(&self, _instance: ModuleInstance) {}

        fn receive(&self, _instance: &ModuleInstance, _message: &Message) {}
    }

    #[test]
    fn load_registered_module() {
        let loader = StaticLoader::new().with_module("builtin/echo", Arc::new(Echo));
        assert!(loader.contains(Path::new("builtin/echo")));

        let library = loader.load(Path::new("builtin/echo")).expect("load");
        assert_eq!(library.path(), Path::new("builtin/echo"));
        assert!(loader.module_apis(&library).is_ok());
        loader.unload(library);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let loader = StaticLoader::new();
        let err = loader.load(Path::new("builtin/nope")).expect_err("missing");
        assert!(matches!(err, LoaderError::NotFound(p) if p == Path::new("builtin/nope")));
    }

    #[test]
    fn register_replaces_existing_entry() {
        let mut loader = StaticLoader::new();
        loader.register("builtin/echo", Arc::new(Echo));
        loader.register("builtin/echo", Arc::new(Echo));
        assert_eq!(loader.names().count(), 1);
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let loader = StaticLoader::new();
        let foreign = LibraryHandle::new("/lib/x.so", 5_u8);
        assert!(!StaticLoader::owns(&foreign));
        assert!(matches!(
            loader.module_apis(&foreign).err(),
            Some(LoaderError::ForeignHandle(_))
        ));
    }
}
