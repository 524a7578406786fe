//! # Engine Configuration
//!
//! Configuration management for the cash session engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_DB_PATH=/var/lib/till/till.db                                 │
//! │     TILL_CLOSE_MAX_ATTEMPTS=8                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till/till.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.till/till.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [database]
//! path = "/var/lib/till/till.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//!
//! [engine]
//! close_max_attempts = 5
//! default_page_size = 50
//! max_page_size = 500
//!
//! [logging]
//! filter = "info,till=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use till_db::DbConfig;

use crate::error::{EngineError, EngineResult};
use crate::telemetry::DEFAULT_LOG_FILTER;

/// Upper bound for `engine.max_page_size`.
pub const PAGE_SIZE_CEILING: u32 = 1_000;

// =============================================================================
// Database Settings
// =============================================================================

/// Session Store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` gives a throwaway store.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "till", "till")
        .map(|dirs| dirs.data_dir().join("till.db"))
        .unwrap_or_else(|| PathBuf::from("till.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

// =============================================================================
// Engine Settings
// =============================================================================

/// Lifecycle and query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// How many close transactions are tried when the store reports a
    /// conflict before giving up.
    #[serde(default = "default_close_max_attempts")]
    pub close_max_attempts: u32,

    /// Page size used when a caller does not ask for one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_close_max_attempts() -> u32 {
    5
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    500
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            close_max_attempts: default_close_max_attempts(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

/// Logging settings. `RUST_LOG` still wins when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a throwaway in-memory store.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.path = PathBuf::from(":memory:");
        config.database.max_connections = 1;
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading till config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load till config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Till config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(EngineError::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }

        if self.engine.close_max_attempts == 0 {
            return Err(EngineError::Config(
                "engine.close_max_attempts must be greater than 0".into(),
            ));
        }

        if self.engine.max_page_size == 0 || self.engine.max_page_size > PAGE_SIZE_CEILING {
            return Err(EngineError::Config(format!(
                "engine.max_page_size must be between 1 and {}",
                PAGE_SIZE_CEILING
            )));
        }

        if self.engine.default_page_size == 0
            || self.engine.default_page_size > self.engine.max_page_size
        {
            return Err(EngineError::Config(format!(
                "engine.default_page_size must be between 1 and max_page_size ({})",
                self.engine.max_page_size
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production). Unparseable numbers are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("TILL_DB_MAX_CONNECTIONS") {
            match value.parse::<u32>() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %value, "Ignoring invalid TILL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(value) = lookup("TILL_CLOSE_MAX_ATTEMPTS") {
            match value.parse::<u32>() {
                Ok(attempts) => {
                    debug!(attempts, "Overriding close attempts from environment");
                    self.engine.close_max_attempts = attempts;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid TILL_CLOSE_MAX_ATTEMPTS"),
            }
        }

        if let Some(value) = lookup("TILL_MAX_PAGE_SIZE") {
            match value.parse::<u32>() {
                Ok(max) => self.engine.max_page_size = max,
                Err(_) => warn!(value = %value, "Ignoring invalid TILL_MAX_PAGE_SIZE"),
            }
        }

        if let Some(filter) = lookup("TILL_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }

    /// Converts the database section into a pool configuration.
    pub fn db_config(&self) -> DbConfig {
        if self.database.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }

        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.engine.close_max_attempts, 5);
        assert_eq!(config.engine.default_page_size, 50);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().unwrap_err().is_config_error());

        config = EngineConfig::default();
        config.engine.close_max_attempts = 0;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.engine.max_page_size = PAGE_SIZE_CEILING + 1;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.engine.default_page_size = config.engine.max_page_size + 1;
        assert!(config.validate().is_err());

        config = EngineConfig::default();
        config.database.min_connections = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [engine]
            close_max_attempts = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.close_max_attempts, 9);
        assert_eq!(config.engine.max_page_size, 500);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TILL_DB_PATH", "/tmp/till-override.db"),
            ("TILL_CLOSE_MAX_ATTEMPTS", "7"),
            ("TILL_MAX_PAGE_SIZE", "not-a-number"),
            ("TILL_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/till-override.db"));
        assert_eq!(config.engine.close_max_attempts, 7);
        assert_eq!(config.engine.max_page_size, 500);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_db_config_conversion() {
        let mut config = EngineConfig::default();
        config.database.path = PathBuf::from("/var/lib/till/till.db");
        config.database.max_connections = 8;

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert!(!db.is_in_memory());

        assert!(EngineConfig::in_memory().db_config().is_in_memory());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("till-config-{}", uuid::Uuid::new_v4()))
            .join("till.toml");

        let mut config = EngineConfig::default();
        config.engine.close_max_attempts = 3;
        config.save(Some(path.clone())).unwrap();

        let loaded = EngineConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.engine.close_max_attempts, 3);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[logging]"));
    }
}
