use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::types::ShellConfig;
use crate::locale::Locale;
use crate::routing::RouteMapping;
use crate::storage::{FileMedium, StorageService};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl ShellConfig {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/mfe-shell/config.toml` on Unix/macOS, or the
    /// equivalent via `dirs::config_dir()`. Falls back to the current
    /// directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("mfe-shell").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file yields `ShellConfig::default()`. An existing file is
    /// parsed as TOML and validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(ShellConfig::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: ShellConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - At least one module is configured, names are unique
    /// - Every route targets a configured module
    /// - Default and fallback locales are supported
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "At least one module must be configured".to_string(),
            });
        }

        let mut names = HashSet::new();
        for module in &self.modules {
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!("Module '{}' is configured more than once", module.name),
                });
            }
        }

        for route in &self.routes {
            if !names.contains(route.module.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Route '{}' targets unknown module '{}'",
                        route.pattern, route.module
                    ),
                });
            }
        }

        for (field, code) in [
            ("default", &self.locale.default),
            ("fallback", &self.locale.fallback),
        ] {
            if Locale::parse(code).is_none() {
                return Err(ConfigError::ValidationError {
                    message: format!("Unsupported {} locale '{}'", field, code),
                });
            }
        }

        Ok(())
    }

    /// The route table in declaration order.
    pub fn route_mappings(&self) -> Vec<RouteMapping> {
        self.routes
            .iter()
            .map(|r| RouteMapping::new(&r.pattern, &r.module, r.exact))
            .collect()
    }

    /// Default locale; validation guarantees it parses.
    pub fn default_locale(&self) -> Locale {
        Locale::parse(&self.locale.default).unwrap_or_default()
    }

    pub fn fallback_locale(&self) -> Locale {
        Locale::parse(&self.locale.fallback).unwrap_or_default()
    }

    /// File-backed storage at the configured or default path.
    pub fn open_storage(&self) -> StorageService {
        let path = self
            .storage
            .path
            .clone()
            .unwrap_or_else(FileMedium::default_path);
        StorageService::file(path)
    }
}
