//! relaygate-loader: module loaders for the gateway.
//!
//! - [`DynamicLoader`] opens shared objects exporting a C function table.
//! - [`StaticLoader`] serves module tables compiled into the host.
//! - [`LayeredLoader`] tries a static table first and falls back to
//!   shared objects.

pub mod dynamic;
pub mod ffi;
pub mod layered;
pub mod static_loader;

pub use dynamic::DynamicLoader;
pub use ffi::{MODULE_APIS_SYMBOL, ModuleApisEntryPoint, RELAYGATE_MODULE_API_VERSION, RawModuleApis};
pub use layered::LayeredLoader;
pub use static_loader::StaticLoader;
