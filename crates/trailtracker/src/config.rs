//! Configuration management for the trail tracker.
//!
//! This module handles loading and validation of the application
//! configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use trail_core::TrackerSettings;

fn default_storage_directory() -> String {
    "paths".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
///
/// Every section is optional; missing sections and keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Recording, proximity and render tunables
    #[serde(default)]
    pub tracker: TrackerSettings,
    /// Where path files live
    #[serde(default)]
    pub storage: StorageSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Path storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding one JSON file per path
    #[serde(default = "default_storage_directory")]
    pub directory: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn storage_directory(&self) -> PathBuf {
        PathBuf::from(&self.storage.directory)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        self.tracker.validate()?;

        if self.storage.directory.trim().is_empty() {
            return Err("Storage directory cannot be empty".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
