//! Configuration management for tilestitch
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Usage
//!
//! ```no_run
//! use tilestitch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Tiles come from: {}", config.source.url_template);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `TILESTITCH__<section>__<key>`
//!
//! Examples:
//! - `TILESTITCH__FETCH__WORKERS=16`
//! - `TILESTITCH__FETCH__MODE=sequential`
//! - `TILESTITCH__SOURCE__URL_TEMPLATE=https://tile.example.com/{z}/{x}/{y}.png`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/tilestitch.toml`.
//! This can be overridden using the `TILESTITCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{
    Config, FetchConfig, FetchMode, MapConfig, SourceConfig, WorkspaceConfig, default_workers,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`TILESTITCH__*`)
    /// 2. TOML file (default: `config/tilestitch.toml`)
    /// 3. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration, reading `path` instead of the default file when given.
    pub fn load_with(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Re-check invariants after command-line overrides were applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
