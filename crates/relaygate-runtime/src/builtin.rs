//! Modules compiled into the host, addressed as `builtin/<name>`.

use std::path::Path;
use std::sync::Arc;

use relaygate_core::{BrokerHandle, Message, ModuleApi, ModuleInstance};
use relaygate_loader::StaticLoader;
use serde::Deserialize;

/// Leading path component that marks a built-in module.
pub const BUILTIN_ROOT: &str = "builtin";

pub fn is_builtin(path: &Path) -> bool {
    path.starts_with(BUILTIN_ROOT)
}

/// Static table of every built-in module.
pub fn registry() -> StaticLoader {
    StaticLoader::new().with_module(Path::new(BUILTIN_ROOT).join("logger"), Arc::new(Logger))
}

// ─── logger ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggerArgs {
    prefix: Option<String>,
}

#[derive(Debug)]
struct LoggerState {
    prefix: String,
}

/// Traces every message it receives.
struct Logger;

impl ModuleApi for Logger {
    fn create(
        &self,
        _broker: &BrokerHandle,
        config: Option<&serde_json::Value>,
    ) -> Option<ModuleInstance> {
        let args = match config {
            Some(value) => match LoggerArgs::deserialize(value) {
                Ok(args) => args,
                Err(e) => {
                    tracing::warn!("logger: invalid args: {e}");
                    return None;
                }
            },
            None => LoggerArgs::default(),
        };
        let prefix = args.prefix.unwrap_or_else(|| "logger".to_owned());
        tracing::info!(%prefix, "logger module created");
        Some(ModuleInstance::new(LoggerState { prefix }))
    }

    fn destroy(&self, instance: ModuleInstance) {
        if let Ok(state) = instance.downcast::<LoggerState>() {
            tracing::info!(prefix = %state.prefix, "logger module destroyed");
        }
    }

    fn receive(&self, instance: &ModuleInstance, message: &Message) {
        let Some(state) = instance.downcast_ref::<LoggerState>() else {
            return;
        };
        tracing::info!(
            prefix = %state.prefix,
            properties = ?message.properties,
            bytes = message.content.len(),
            "message received"
        );
    }
}
