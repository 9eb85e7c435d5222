//! Gateway configuration file: loading, path resolution and static checks.
//!
//! ```json
//! {
//!   "modules": [
//!     { "name": "logger", "module_path": "builtin/logger", "args": { "prefix": "gw" } },
//!     { "module name": "sensor", "module path": "lib/libsensor.so" }
//!   ],
//!   "links": [ { "source": "sensor", "sink": "logger" } ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use relaygate_core::{GatewayProperties, LinkEntry};
use thiserror::Error;

use crate::builtin;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed configuration file with module paths resolved.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub source: PathBuf,
    pub properties: GatewayProperties,
}

pub fn load(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut properties = parse(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    resolve_module_paths(&mut properties, base);
    tracing::debug!(
        path = %path.display(),
        modules = properties.modules.len(),
        links = properties.links.len(),
        "configuration loaded"
    );
    Ok(GatewayConfig {
        source: path.to_path_buf(),
        properties,
    })
}

pub fn parse(text: &str) -> Result<GatewayProperties, serde_json::Error> {
    serde_json::from_str(text)
}

/// Make relative library paths relative to `base`. Built-in names and
/// absolute paths are left alone.
pub fn resolve_module_paths(properties: &mut GatewayProperties, base: &Path) {
    for entry in &mut properties.modules {
        let Some(path) = entry.module_path.as_mut() else {
            continue;
        };
        if path.is_relative() && !builtin::is_builtin(path) && !path.as_os_str().is_empty() {
            *path = base.join(&*path);
        }
    }
}

// ─── Static checks ───────────────────────────────────────────────

/// A problem that would make gateway creation fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    UnnamedModule { index: usize },
    MissingPath { module: String },
    DuplicateModule { module: String },
    EmptyLinkEndpoint { link: LinkEntry },
    DuplicateLink { link: LinkEntry },
    UnknownModule { link: LinkEntry, module: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnnamedModule { index } => write!(f, "module #{index} has no name"),
            Self::MissingPath { module } => write!(f, "module `{module}` has no module path"),
            Self::DuplicateModule { module } => {
                write!(f, "module `{module}` is declared more than once")
            }
            Self::EmptyLinkEndpoint { link } => write!(f, "link `{link}` has an empty endpoint"),
            Self::DuplicateLink { link } => write!(f, "link `{link}` is declared more than once"),
            Self::UnknownModule { link, module } => {
                write!(f, "link `{link}` names undeclared module `{module}`")
            }
        }
    }
}

/// Check `properties` the way gateway creation would, without loading
/// anything. Issues are reported in declaration order.
pub fn validate(properties: &GatewayProperties) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut names = HashSet::new();
    for (index, entry) in properties.modules.iter().enumerate() {
        if entry.name.is_empty() {
            issues.push(Issue::UnnamedModule { index });
            continue;
        }
        let has_path = entry
            .module_path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if !has_path {
            issues.push(Issue::MissingPath {
                module: entry.name.clone(),
            });
        }
        if !names.insert(entry.name.as_str()) {
            issues.push(Issue::DuplicateModule {
                module: entry.name.clone(),
            });
        }
    }

    let mut links = HashSet::new();
    for link in &properties.links {
        if link.source.is_empty() || link.sink.is_empty() {
            issues.push(Issue::EmptyLinkEndpoint { link: link.clone() });
            continue;
        }
        if !links.insert((link.source.as_str(), link.sink.as_str())) {
            issues.push(Issue::DuplicateLink { link: link.clone() });
            continue;
        }
        for endpoint in [&link.source, &link.sink] {
            if !names.contains(endpoint.as_str()) {
                issues.push(Issue::UnknownModule {
                    link: link.clone(),
                    module: endpoint.clone(),
                });
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use relaygate_core::ModuleEntry;

    use super::*;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("gateway.json");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(body.as_bytes()).expect("write");
        path
    }

    // ── Loading ──────────────────────────────────────────────────────

    #[test]
    fn load_resolves_relative_paths_against_config_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            r#"{
                "modules": [
                    {"module name": "sensor", "module path": "lib/libsensor.so"},
                    {"name": "logger", "module_path": "builtin/logger"},
                    {"name": "abs", "module_path": "/opt/libabs.so"}
                ],
                "links": [{"source": "sensor", "sink": "logger"}]
            }"#,
        );

        let config = load(&path).expect("load");
        let paths: Vec<_> = config
            .properties
            .modules
            .iter()
            .map(|m| m.module_path.clone().expect("path"))
            .collect();
        assert_eq!(
            paths,
            [
                dir.path().join("lib/libsensor.so"),
                PathBuf::from("builtin/logger"),
                PathBuf::from("/opt/libabs.so"),
            ]
        );
        assert_eq!(config.properties.links.len(), 1);
        assert_eq!(config.source, path);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "{ \"modules\": [ ");
        let err = load(&path).expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("gateway.json"));
    }

    #[test]
    fn empty_object_is_an_empty_gateway() {
        let props = parse("{}").expect("parse");
        assert!(validate(&props).is_empty());
    }

    // ── Validation ───────────────────────────────────────────────────

    #[test]
    fn valid_topology_has_no_issues() {
        let props = GatewayProperties {
            modules: vec![ModuleEntry::new("a", "a.so"), ModuleEntry::new("b", "b.so")],
            links: vec![LinkEntry::new("a", "b"), LinkEntry::new("b", "a")],
        };
        assert!(validate(&props).is_empty());
    }

    #[test]
    fn link_to_undeclared_module_is_reported() {
        let props = GatewayProperties {
            modules: vec![ModuleEntry::new("a", "a.so")],
            links: vec![LinkEntry::new("a", "ghost")],
        };
        assert_eq!(
            validate(&props),
            [Issue::UnknownModule {
                link: LinkEntry::new("a", "ghost"),
                module: "ghost".into(),
            }]
        );
    }

    #[test]
    fn duplicates_and_missing_fields_are_reported_in_order() {
        let props = GatewayProperties {
            modules: vec![
                ModuleEntry::new("a", "a.so"),
                ModuleEntry {
                    name: "b".into(),
                    ..ModuleEntry::default()
                },
                ModuleEntry::new("a", "again.so"),
                ModuleEntry::default(),
            ],
            links: vec![
                LinkEntry::new("a", "b"),
                LinkEntry::new("a", "b"),
                LinkEntry::new("", "b"),
            ],
        };
        let issues: Vec<_> = validate(&props).iter().map(ToString::to_string).collect();
        assert_eq!(
            issues,
            [
                "module `b` has no module path",
                "module `a` is declared more than once",
                "module #3 has no name",
                "link `a -> b` is declared more than once",
                "link ` -> b` has an empty endpoint",
            ]
        );
    }
}
