//! Configuration file schema (conduit.toml, ~/.conduit/config.toml)
//!
//! Both files share one schema. Every field is optional so a file only
//! needs to mention what it overrides.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest accepted engine worker count
pub const MAX_WORKER_THREADS: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConduitConfig {
    /// Which engine library to load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<LibrarySection>,

    /// Bridge behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeSection>,

    /// Options passed to the engine at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSection>,

    /// Logging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LibrarySection {
    /// Path to the engine library (takes precedence over `name`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Library name resolved with platform conventions (`lib{name}.so`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Extra directories searched before the platform defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Deadline for each execute call, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execute_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `conduit_runtime=debug`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ConduitConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(library) = &self.library {
            if library.name.as_deref() == Some("") {
                return Err(invalid("library.name", "name cannot be empty"));
            }
            if library.path.as_deref() == Some(Path::new("")) {
                return Err(invalid("library.path", "path cannot be empty"));
            }
        }

        if let Some(timeout) = self.bridge.as_ref().and_then(|b| b.execute_timeout_ms) {
            if timeout == 0 {
                return Err(invalid(
                    "bridge.execute_timeout_ms",
                    "timeout must be greater than zero",
                ));
            }
        }

        if let Some(workers) = self.engine.as_ref().and_then(|e| e.worker_threads) {
            if workers == 0 || workers > MAX_WORKER_THREADS {
                return Err(invalid(
                    "engine.worker_threads",
                    &format!("must be between 1 and {MAX_WORKER_THREADS}, got {workers}"),
                ));
            }
        }

        if let Some(filter) = self.log.as_ref().and_then(|l| l.filter.as_deref()) {
            if filter.trim().is_empty() {
                return Err(invalid("log.filter", "filter cannot be empty"));
            }
        }

        Ok(())
    }

    /// Merge another config into this one
    ///
    /// `other` takes precedence field by field; its search paths are
    /// searched before ours.
    pub fn merge(&mut self, other: &ConduitConfig) {
        if let Some(theirs) = &other.library {
            let ours = self.library.get_or_insert_with(Default::default);
            if theirs.path.is_some() || theirs.name.is_some() {
                ours.path = theirs.path.clone();
                ours.name = theirs.name.clone();
            }
            let mut search_paths = theirs.search_paths.clone();
            search_paths.append(&mut ours.search_paths);
            ours.search_paths = search_paths;
        }
        if let Some(theirs) = &other.bridge {
            let ours = self.bridge.get_or_insert_with(Default::default);
            if theirs.execute_timeout_ms.is_some() {
                ours.execute_timeout_ms = theirs.execute_timeout_ms;
            }
        }
        if let Some(theirs) = &other.engine {
            let ours = self.engine.get_or_insert_with(Default::default);
            if theirs.worker_threads.is_some() {
                ours.worker_threads = theirs.worker_threads;
            }
        }
        if let Some(theirs) = &other.log {
            let ours = self.log.get_or_insert_with(Default::default);
            if theirs.filter.is_some() {
                ours.filter = theirs.filter.clone();
            }
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
