//! Configuration management for adsift
//!
//! All configuration is loaded from `./config/adsift.toml`. No hardcoded
//! defaults exist in source code - all defaults are in the config template.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Configuration file path relative to working directory.
pub const CONFIG_PATH: &str = "./config/adsift.toml";

/// Default configuration file content - this is the ONLY place defaults exist.
pub const DEFAULT_CONFIG: &str = include_str!("../config/adsift.toml");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}. Run `adsift init` to create it.")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Chunk size must be at least 1 (got {0})")]
    InvalidChunkSize(usize),

    #[error("Unknown output format '{0}' (expected 'csv' or 'json')")]
    UnknownFormat(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub acquisition: AcquisitionConfig,
    pub output: OutputConfig,
}

/// Input and accumulator file locations.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Reference export of candidate companies.
    pub reference_path: PathBuf,
    /// Current-customer population export.
    pub customers_path: PathBuf,
    /// Durable accumulator of scraped hit counts.
    pub accumulator_path: PathBuf,
}

/// Scraper adapter and chunking settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionConfig {
    /// Companies per adapter invocation.
    pub chunk_size: usize,
    /// External scraper program.
    pub adapter_command: String,
    #[serde(default)]
    pub adapter_args: Vec<String>,
    /// Record completed chunks so interrupted runs resume without
    /// double-counting.
    #[serde(default)]
    pub use_ledger: bool,
}

/// Reconciliation output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl AppConfig {
    /// Load and validate configuration from the given path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.acquisition.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(0));
        }
        if self.acquisition.adapter_command.trim().is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "acquisition.adapter_command".to_string(),
            });
        }
        for (field, path) in [
            ("data.reference_path", &self.data.reference_path),
            ("data.customers_path", &self.data.customers_path),
            ("data.accumulator_path", &self.data.accumulator_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyRequired {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Write the default configuration template to `path`. Refuses to overwrite
/// an existing file.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}
