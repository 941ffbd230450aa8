//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homereg.toml` in the working directory, or the file named by
//! `HOMEREG_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use homereg_app::registry::{DuplicateKeyPolicy, RegistryConfig};

const DEFAULT_CONFIG_FILE: &str = "homereg.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Persistence settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Registry behaviour.
    pub registry: RegistryConfig,
    /// Event bus settings.
    pub event_bus: EventBusConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// JSON storage configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the storage files.
    pub dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// In-process event bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Events buffered per subscriber before the slowest one lags.
    pub capacity: usize,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo provider.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("HOMEREG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = var("HOMEREG_STORAGE_DIR") {
            self.storage.dir = val.into();
        }
        if let Some(val) = var("HOMEREG_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("HOMEREG_DUPLICATE_KEYS") {
            self.registry.duplicate_keys = match val.to_ascii_lowercase().as_str() {
                "allow" => DuplicateKeyPolicy::Allow,
                "reject" => DuplicateKeyPolicy::Reject,
                other => {
                    return Err(ConfigError::Validation(format!(
                        "unknown duplicate key policy '{other}'"
                    )));
                }
            };
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage dir must not be empty".to_string(),
            ));
        }
        if self.event_bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "event bus capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("userdata"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homereg=info".to_string(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
