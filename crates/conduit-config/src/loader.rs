//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::settings::{BridgeSection, ConduitConfig, EngineSection, LibrarySection, LogSection};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project configuration file name
pub const PROJECT_FILE: &str = "conduit.toml";

pub const ENV_LIBRARY: &str = "CONDUIT_LIBRARY";
pub const ENV_TIMEOUT_MS: &str = "CONDUIT_TIMEOUT_MS";
pub const ENV_WORKERS: &str = "CONDUIT_WORKERS";
pub const ENV_LOG: &str = "CONDUIT_LOG";

/// Log filter used when nothing configures one
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.conduit/config.toml) - lowest priority
/// 2. Project config (nearest conduit.toml) - overrides global
/// 3. Environment variables (CONDUIT_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Global config path; resolved from the home directory when unset
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: ConduitConfig,

    /// Project file that contributed, if one was found
    pub project_file: Option<PathBuf>,

    /// Global file that contributed, if it exists
    pub global_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use `path` instead of ~/.conduit/config.toml
    pub fn with_global_path(path: impl Into<PathBuf>) -> Self {
        Self {
            global_config_path: Some(path.into()),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find conduit.toml and merges it over
    /// the global config, then applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (mut settings, global_file) = self.load_global_config()?;

        let project_file = find_project_file(start_dir);
        if let Some(path) = &project_file {
            settings.merge(&ConduitConfig::load_from_file(path)?);
        }

        apply_env_overrides(&mut settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_file,
            global_file,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let (mut settings, global_file) = self.load_global_config()?;
        settings.merge(&ConduitConfig::load_from_file(config_path)?);
        apply_env_overrides(&mut settings)?;
        settings.validate()?;

        Ok(Config {
            settings,
            project_file: Some(config_path.to_path_buf()),
            global_file,
        })
    }

    /// Load global configuration; a missing file is an empty config
    fn load_global_config(&mut self) -> ConfigResult<(ConduitConfig, Option<PathBuf>)> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match Self::global_config_dir() {
                Ok(dir) => {
                    let path = dir.join("config.toml");
                    self.global_config_path = Some(path.clone());
                    path
                }
                // No home directory: nothing global to load.
                Err(ConfigError::HomeNotFound) => return Ok((ConduitConfig::default(), None)),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok((ConduitConfig::default(), None));
        }

        Ok((ConduitConfig::load_from_file(&path)?, Some(path)))
    }

    /// Get the global configuration directory (~/.conduit)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".conduit"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn find_project_file(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|path| path.is_file())
}

/// Apply CONDUIT_* environment variable overrides
fn apply_env_overrides(config: &mut ConduitConfig) -> ConfigResult<()> {
    if let Some(library) = env_var(ENV_LIBRARY) {
        let section = config.library.get_or_insert_with(LibrarySection::default);
        section.path = Some(PathBuf::from(library));
        section.name = None;
    }

    if let Some(timeout) = env_var(ENV_TIMEOUT_MS) {
        let ms = timeout.parse::<u64>().map_err(|e| ConfigError::InvalidEnv {
            var: ENV_TIMEOUT_MS,
            reason: e.to_string(),
        })?;
        config
            .bridge
            .get_or_insert_with(BridgeSection::default)
            .execute_timeout_ms = Some(ms);
    }

    if let Some(workers) = env_var(ENV_WORKERS) {
        let n = workers.parse::<usize>().map_err(|e| ConfigError::InvalidEnv {
            var: ENV_WORKERS,
            reason: e.to_string(),
        })?;
        config
            .engine
            .get_or_insert_with(EngineSection::default)
            .worker_threads = Some(n);
    }

    if let Some(filter) = env_var(ENV_LOG) {
        config.log.get_or_insert_with(LogSection::default).filter = Some(filter);
    }

    Ok(())
}

/// A set, non-blank environment variable
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    /// Library path or name to load, if configured
    pub fn library_target(&self) -> Option<String> {
        let library = self.settings.library.as_ref()?;
        library
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .or_else(|| library.name.clone())
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        self.settings
            .library
            .as_ref()
            .map(|library| library.search_paths.as_slice())
            .unwrap_or(&[])
    }

    pub fn execute_timeout(&self) -> Option<Duration> {
        self.settings
            .bridge
            .as_ref()
            .and_then(|bridge| bridge.execute_timeout_ms)
            .map(Duration::from_millis)
    }

    pub fn worker_threads(&self) -> Option<usize> {
        self.settings
            .engine
            .as_ref()
            .and_then(|engine| engine.worker_threads)
    }

    /// Effective log filter (config > default)
    pub fn log_filter(&self) -> &str {
        self.settings
            .log
            .as_ref()
            .and_then(|log| log.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }
}
