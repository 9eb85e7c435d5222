use std::path::Path;
use std::sync::Arc;

use libloading::{Library, Symbol};
use relaygate_core::{LibraryHandle, LoaderError, ModuleApi, ModuleLoader};

use crate::ffi::{self, FfiModuleApi, MODULE_APIS_SYMBOL, ModuleApisEntryPoint, ValidatedApis};

/// A mapped shared object together with its validated function table.
struct LoadedLibrary {
    library: Arc<Library>,
    apis: ValidatedApis,
}

/// Loads modules from shared objects.
///
/// The function table is resolved and validated in [`ModuleLoader::load`],
/// so a library with a missing or malformed table never reaches module
/// instantiation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLoader;

impl DynamicLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for DynamicLoader {
    fn load(&self, path: &Path) -> Result<LibraryHandle, LoaderError> {
        // SAFETY: loading runs the library's initializers. Module libraries
        // are trusted host extensions.
        let library = unsafe { Library::new(path) }.map_err(|e| LoaderError::Load {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

        let apis = {
            // SAFETY: the symbol is declared with the module ABI signature.
            let entry: Symbol<'_, ModuleApisEntryPoint> =
                unsafe { library.get(MODULE_APIS_SYMBOL) }.map_err(|_| {
                    LoaderError::MissingEntryPoint {
                        path: path.to_path_buf(),
                        symbol: String::from_utf8_lossy(
                            MODULE_APIS_SYMBOL.strip_suffix(b"\0").unwrap_or(MODULE_APIS_SYMBOL),
                        )
                        .into_owned(),
                    }
                })?;
            // SAFETY: the entry point returns null or a pointer to a static
            // table inside the still-mapped library.
            unsafe { ffi::validate(path, entry()) }?
        };

        tracing::debug!(path = %path.display(), "module library loaded");
        Ok(LibraryHandle::new(
            path,
            LoadedLibrary {
                library: Arc::new(library),
                apis,
            },
        ))
    }

    fn module_apis(&self, library: &LibraryHandle) -> Result<Arc<dyn ModuleApi>, LoaderError> {
        let loaded = library
            .downcast_ref::<LoadedLibrary>()
            .ok_or_else(|| LoaderError::ForeignHandle(library.path().to_path_buf()))?;
        Ok(Arc::new(FfiModuleApi::new(
            library.path().to_path_buf(),
            loaded.apis,
            Arc::clone(&loaded.library) as Arc<dyn std::any::Any + Send + Sync>,
        )))
    }

    fn unload(&self, library: LibraryHandle) {
        // The mapping goes away once the last function table using it is
        // dropped.
        tracing::debug!(path = %library.path().display(), "module library unloaded");
        drop(library);
    }
}
