//! C ABI exported by shared-object modules.
//!
//! A module library exports `relaygate_module_apis`, a function returning a
//! pointer to a static [`RawModuleApis`]. The table is checked once when the
//! library is loaded; the copied function pointers are then wrapped in a
//! [`FfiModuleApi`] that keeps the library mapped.

use std::any::Any;
use std::ffi::{CString, c_char, c_void};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use relaygate_core::{BrokerHandle, LoaderError, Message, ModuleApi, ModuleInstance};

/// Version of [`RawModuleApis`] this host understands.
pub const RELAYGATE_MODULE_API_VERSION: u32 = 1;

/// NUL-terminated name of the exported entry point.
pub const MODULE_APIS_SYMBOL: &[u8] = b"relaygate_module_apis\0";

/// Signature of the exported entry point.
pub type ModuleApisEntryPoint = unsafe extern "C" fn() -> *const RawModuleApis;

/// `create(broker, config_json)`. `broker` is opaque and valid only for the
/// duration of the call; `config_json` is NUL-terminated JSON or null.
/// Returns null on failure.
pub type RawCreate = unsafe extern "C" fn(*const c_void, *const c_char) -> *mut c_void;
pub type RawDestroy = unsafe extern "C" fn(*mut c_void);
/// `receive(instance, content, content_len)`.
pub type RawReceive = unsafe extern "C" fn(*mut c_void, *const u8, usize);

#[repr(C)]
pub struct RawModuleApis {
    pub api_version: u32,
    pub create: Option<RawCreate>,
    pub destroy: Option<RawDestroy>,
    pub receive: Option<RawReceive>,
}

/// Function pointers copied out of a validated [`RawModuleApis`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValidatedApis {
    create: RawCreate,
    destroy: RawDestroy,
    receive: RawReceive,
}

/// Check the table returned by a module's entry point.
///
/// # Safety
///
/// `table` must be null or point to a `RawModuleApis` that stays valid for
/// the duration of this call.
pub(crate) unsafe fn validate(
    path: &Path,
    table: *const RawModuleApis,
) -> Result<ValidatedApis, LoaderError> {
    let invalid = |detail: String| LoaderError::InvalidApiTable {
        path: path.to_path_buf(),
        detail,
    };
    // SAFETY: caller guarantees `table` is null or valid.
    let Some(raw) = (unsafe { table.as_ref() }) else {
        return Err(invalid("entry point returned a null table".to_owned()));
    };
    if raw.api_version != RELAYGATE_MODULE_API_VERSION {
        return Err(invalid(format!(
            "api version {} (host expects {RELAYGATE_MODULE_API_VERSION})",
            raw.api_version
        )));
    }
    let (Some(create), Some(destroy), Some(receive)) = (raw.create, raw.destroy, raw.receive)
    else {
        return Err(invalid("create, destroy and receive are all required".to_owned()));
    };
    Ok(ValidatedApis {
        create,
        destroy,
        receive,
    })
}

/// Instance pointer handed out by a foreign module.
struct ForeignInstance(*mut c_void);

// SAFETY: the module ABI requires instances to be usable from any thread;
// the gateway never touches an instance from two threads at once.
unsafe impl Send for ForeignInstance {}

/// [`ModuleApi`] backed by a validated C function table.
pub struct FfiModuleApi {
    path: PathBuf,
    apis: ValidatedApis,
    /// Keeps the code behind `apis` mapped.
    _keepalive: Arc<dyn Any + Send + Sync>,
}

impl FfiModuleApi {
    pub(crate) fn new(
        path: PathBuf,
        apis: ValidatedApis,
        keepalive: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            path,
            apis,
            _keepalive: keepalive,
        }
    }
}

impl ModuleApi for FfiModuleApi {
    fn create(
        &self,
        broker: &BrokerHandle,
        config: Option<&serde_json::Value>,
    ) -> Option<ModuleInstance> {
        let config = match config.map(|c| CString::new(c.to_string())).transpose() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "module config not passable: {e}");
                return None;
            }
        };
        let config_ptr = config.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());
        let broker_ptr = std::ptr::from_ref(broker).cast::<c_void>();
        // SAFETY: the table was validated at load time and the library is
        // kept mapped by `_keepalive`; both pointers outlive the call.
        let instance = unsafe { (self.apis.create)(broker_ptr, config_ptr) };
        if instance.is_null() {
            tracing::debug!(path = %self.path.display(), "module create returned null");
            return None;
        }
        Some(ModuleInstance::new(ForeignInstance(instance)))
    }

    fn destroy(&self, instance: ModuleInstance) {
        match instance.downcast::<ForeignInstance>() {
            // SAFETY: the pointer came from this table's `create` and is
            // destroyed exactly once, here.
            Ok(foreign) => unsafe { (self.apis.destroy)(foreign.0) },
            Err(_) => {
                tracing::warn!(path = %self.path.display(), "destroy of a foreign instance skipped")
            }
        }
    }

    fn receive(&self, instance: &ModuleInstance, message: &Message) {
        let Some(foreign) = instance.downcast_ref::<ForeignInstance>() else {
            tracing::warn!(path = %self.path.display(), "receive on a foreign instance skipped");
            return;
        };
        let content = message.content.as_slice();
        // SAFETY: live instance from this table; the slice outlives the call.
        unsafe { (self.apis.receive)(foreign.0, content.as_ptr(), content.len()) }
    }
}
