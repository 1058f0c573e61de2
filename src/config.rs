//! Configuration module for gator.
//!
//! The configuration lives in a JSON file (by default `~/.gatorconfig.json`)
//! holding the database URL and the name of the active user, plus optional
//! tuning sections. Every field has a default so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{GatorError, Result};

/// File name of the configuration inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable overriding the database URL.
pub const DB_URL_ENV: &str = "GATOR_DB_URL";

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; logs always go to stderr as well.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Feed fetching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    /// User agent sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Total request deadline in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    crate::rss::MAX_FEED_SIZE
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
        }
    }
}

/// Output formatting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Timezone for displaying dates (e.g., "Europe/Rome", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Database connection URL.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Name of the active user.
    #[serde(default)]
    pub current_user_name: String,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed fetching configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    /// Output formatting configuration.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Where the configuration was loaded from.
    #[serde(skip)]
    path: Option<PathBuf>,
    /// `db_url` as read from the file, kept while an override is active.
    #[serde(skip)]
    file_db_url: Option<String>,
}

fn default_db_url() -> String {
    "sqlite://gator.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: default_db_url(),
            current_user_name: String::new(),
            logging: LoggingConfig::default(),
            aggregator: AggregatorConfig::default(),
            display: DisplayConfig::default(),
            path: None,
            file_db_url: None,
        }
    }
}

impl Config {
    /// Resolve the configuration file path.
    ///
    /// `GATOR_CONFIG` wins; otherwise the file lives in the home directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .ok_or_else(|| GatorError::Config("no home directory found".to_string()))?;
        Ok(PathBuf::from(home).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                GatorError::Config(format!("config file {} not found", path.display()))
            }
            _ => GatorError::Io(e),
        })?;
        let mut config = Self::parse(&content)?;
        config.path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load configuration from a JSON file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn parse(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DB_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        self.override_db_url(std::env::var(DB_URL_ENV).ok());
    }

    /// Use `db_url` for this run without writing it back on [`Config::save`].
    ///
    /// `None` or an empty string leaves the configured URL in place.
    pub fn override_db_url(&mut self, db_url: Option<String>) {
        let Some(db_url) = db_url.filter(|url| !url.is_empty()) else {
            return;
        };
        if self.file_db_url.is_none() {
            self.file_db_url = Some(std::mem::replace(&mut self.db_url, db_url));
        } else {
            self.db_url = db_url;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.db_url.trim().is_empty() {
            return Err(GatorError::Config("db_url is not set".to_string()));
        }
        if self.aggregator.request_timeout_secs == 0 {
            return Err(GatorError::Config(
                "aggregator.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Path the configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Attach a file path used by [`Config::save`].
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Write the configuration back to its file.
    ///
    /// An overridden `db_url` is not persisted; the file keeps its own.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| GatorError::Config("configuration has no file path".to_string()))?;
        let mut on_disk = self.clone();
        if let Some(db_url) = &self.file_db_url {
            on_disk.db_url = db_url.clone();
        }
        let data = serde_json::to_string_pretty(&on_disk)
            .map_err(|e| GatorError::Config(format!("config serialize error: {e}")))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Set the active user and persist the change.
    pub fn set_user(&mut self, name: &str) -> Result<()> {
        self.current_user_name = name.trim().to_string();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.db_url, "sqlite://gator.db");
        assert!(config.current_user_name.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
        assert_eq!(config.aggregator.user_agent, "gator");
        assert_eq!(config.aggregator.request_timeout_secs, 30);
        assert_eq!(config.aggregator.connect_timeout_secs, 10);
        assert_eq!(config.aggregator.max_redirects, 5);
        assert_eq!(config.aggregator.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.display.timezone, "UTC");
    }

    #[test]
    fn test_parse_original_shape() {
        let json = r#"{"db_url":"postgres://localhost/gator","current_user_name":"kahya"}"#;
        let config = Config::parse(json).unwrap();

        assert_eq!(config.db_url, "postgres://localhost/gator");
        assert_eq!(config.current_user_name, "kahya");
        assert_eq!(config.aggregator.user_agent, "gator");
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "db_url": "sqlite://custom.db",
            "current_user_name": "alice",
            "logging": { "level": "debug", "file": "logs/gator.log" },
            "aggregator": {
                "user_agent": "gator-test",
                "request_timeout_secs": 5,
                "connect_timeout_secs": 2,
                "max_redirects": 1,
                "max_feed_size_bytes": 1024
            },
            "display": { "timezone": "Europe/Rome" }
        }"#;

        let config = Config::parse(json).unwrap();
        assert_eq!(config.db_url, "sqlite://custom.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("logs/gator.log"));
        assert_eq!(config.aggregator.user_agent, "gator-test");
        assert_eq!(config.aggregator.request_timeout_secs, 5);
        assert_eq!(config.aggregator.max_feed_size_bytes, 1024);
        assert_eq!(config.display.timezone, "Europe/Rome");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("{ not json");

        assert!(result.is_err());
        if let Err(GatorError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.json");
        assert!(matches!(result, Err(GatorError::Config(_))));
    }

    #[test]
    fn test_set_user_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gator.json");
        std::fs::write(&path, r#"{"db_url":"sqlite://x.db","current_user_name":""}"#).unwrap();

        let mut config = Config::load(&path).unwrap();
        config.set_user("  bob ").unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.current_user_name, "bob");
        assert_eq!(reloaded.db_url, "sqlite://x.db");
    }

    #[test]
    fn test_set_user_keeps_file_db_url_under_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gator.json");
        std::fs::write(&path, r#"{"db_url":"sqlite://file.db","current_user_name":""}"#).unwrap();

        let mut config = Config::load(&path).unwrap();
        config.override_db_url(Some("sqlite://override.db".to_string()));
        config.override_db_url(Some("sqlite://second.db".to_string()));
        assert_eq!(config.db_url, "sqlite://second.db");
        config.set_user("bob").unwrap();
        assert_eq!(config.db_url, "sqlite://second.db");

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.current_user_name, "bob");
        assert_eq!(reloaded.db_url, "sqlite://file.db");
    }

    #[test]
    fn test_empty_db_url_override_is_ignored() {
        let mut config = Config::default();
        config.override_db_url(Some(String::new()));
        config.override_db_url(None);
        assert_eq!(config.db_url, "sqlite://gator.db");
    }

    #[test]
    fn test_save_without_path_fails() {
        let config = Config::default();
        assert!(matches!(config.save(), Err(GatorError::Config(_))));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.db_url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.aggregator.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
