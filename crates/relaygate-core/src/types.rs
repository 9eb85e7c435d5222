use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ─── Module identity ─────────────────────────────────────────────

/// Identity of a module instance attached to a gateway.
///
/// Assigned by the gateway when a module is instantiated. Removal looks
/// modules up by this identity, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(u64);

impl ModuleId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

// ─── Descriptors ─────────────────────────────────────────────────

/// Declares one module to load into a gateway.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Name of the module, unique within a gateway.
    #[serde(alias = "module name")]
    pub name: String,
    /// Library to load the module from. `None` is rejected as invalid input.
    #[serde(default, alias = "module path")]
    pub module_path: Option<PathBuf>,
    /// Opaque configuration handed to the module's create entry point.
    #[serde(default)]
    pub args: Option<serde_json::Value>,
}

impl ModuleEntry {
    pub fn new(name: impl Into<String>, module_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            module_path: Some(module_path.into()),
            args: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = Some(args);
        self
    }
}

/// Declares a directed routing edge between two module names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LinkEntry {
    pub source: String,
    pub sink: String,
}

impl LinkEntry {
    pub fn new(source: impl Into<String>, sink: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sink: sink.into(),
        }
    }
}

impl fmt::Display for LinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.sink)
    }
}

/// Initial topology for a gateway: modules first, then links, both in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GatewayProperties {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

// ─── Results & snapshots ─────────────────────────────────────────

/// Outcome of adding a link to a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddLinkResult {
    Success,
    /// Source or sink name missing.
    InvalidArg,
    /// Duplicate link, or an endpoint that names no attached module.
    Error,
}

impl AddLinkResult {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InvalidArg => "invalid_arg",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AddLinkResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lightweight per-module entry of a module-list snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
}
