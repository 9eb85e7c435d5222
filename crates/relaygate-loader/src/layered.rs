use std::path::Path;
use std::sync::Arc;

use relaygate_core::{LibraryHandle, LoaderError, ModuleApi, ModuleLoader};

use crate::dynamic::DynamicLoader;
use crate::static_loader::StaticLoader;

/// Resolves a path against the static table first and falls back to
/// loading a shared object.
#[derive(Debug, Default)]
pub struct LayeredLoader {
    builtin: StaticLoader,
    dynamic: DynamicLoader,
}

impl LayeredLoader {
    pub fn new(builtin: StaticLoader) -> Self {
        Self {
            builtin,
            dynamic: DynamicLoader::new(),
        }
    }

    pub fn builtin(&self) -> &StaticLoader {
        &self.builtin
    }
}

impl ModuleLoader for LayeredLoader {
    fn load(&self, path: &Path) -> Result<LibraryHandle, LoaderError> {
        if self.builtin.contains(path) {
            return self.builtin.load(path);
        }
        self.dynamic.load(path)
    }

    fn module_apis(&self, library: &LibraryHandle) -> Result<Arc<dyn ModuleApi>, LoaderError> {
        if StaticLoader::owns(library) {
            self.builtin.module_apis(library)
        } else {
            self.dynamic.module_apis(library)
        }
    }

    fn unload(&self, library: LibraryHandle) {
        if StaticLoader::owns(&library) {
            self.builtin.unload(library);
        } else {
            self.dynamic.unload(library);
        }
    }
}
