//! Main application configuration
//!
//! This module defines the primary configuration structures for the contest
//! rating service, including environment variable loading and validation.

use crate::config::rating::RatingSettings;
use crate::rating::{SeedRatingConfig, MAX_RATING, MIN_RATING};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub rating: RatingSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Snapshot storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON snapshot holding scoreboards and rating data
    pub snapshot_path: PathBuf,
    /// Pretty-print the snapshot when writing it back
    pub pretty_snapshot: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "contest-rating".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("ratings.json"),
            pretty_snapshot: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }

        // Rating settings
        if let Ok(initial) = env::var("INITIAL_RATING") {
            self.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }

        // Storage settings
        if let Ok(path) = env::var("SNAPSHOT_PATH") {
            self.storage.snapshot_path = PathBuf::from(path);
        }
        if let Ok(pretty) = env::var("PRETTY_SNAPSHOT") {
            self.storage.pretty_snapshot = pretty
                .parse()
                .map_err(|_| anyhow!("Invalid PRETTY_SNAPSHOT value: {}", pretty))?;
        }

        Ok(())
    }

    /// Rating engine configuration derived from these settings
    pub fn seed_rating_config(&self) -> SeedRatingConfig {
        SeedRatingConfig::from(&self.rating)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }

    // Validate rating settings
    if !(MIN_RATING..=MAX_RATING).contains(&config.rating.initial_rating) {
        return Err(anyhow!(
            "Initial rating must be within [{}, {}], got {}",
            MIN_RATING,
            MAX_RATING,
            config.rating.initial_rating
        ));
    }

    // Validate storage settings
    if config.storage.snapshot_path.as_os_str().is_empty() {
        return Err(anyhow!("Snapshot path cannot be empty"));
    }

    Ok(())
}
