//! Conduit Configuration System
//!
//! Provides configuration management for conduit bridges including:
//! - Project configuration (conduit.toml)
//! - Global user configuration (~/.conduit/config.toml)
//! - Environment overrides (CONDUIT_*)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.conduit/config.toml)
//! 2. Project config (nearest conduit.toml)
//! 3. Environment variables (CONDUIT_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use conduit_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod loader;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid value in environment variable {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use settings::{BridgeSection, ConduitConfig, EngineSection, LibrarySection, LogSection};
