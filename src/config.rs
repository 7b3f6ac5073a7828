//! Configuration module for Gator.
//!
//! The configuration lives in a small JSON file (`~/.gatorconfig.json` by
//! default) holding the database URL, the active user name and tuning knobs
//! for the poller and logging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GatorError, Result};

/// File name of the configuration file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable overriding the database URL.
pub const DB_URL_ENV: &str = "GATOR_DB_URL";

/// Feed polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Shortest accepted interval between two polling cycles, in seconds.
    #[serde(default = "default_min_interval")]
    pub min_interval_secs: u64,
    /// User agent sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Reject feed URLs pointing at loopback, private or link-local hosts.
    #[serde(default = "default_block_private_hosts")]
    pub block_private_hosts: bool,
}

fn default_min_interval() -> u64 {
    5
}

fn default_user_agent() -> String {
    "gator".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_block_private_hosts() -> bool {
    true
}

impl PollConfig {
    /// The interval floor as a [`Duration`].
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: default_min_interval(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            block_private_hosts: default_block_private_hosts(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection string.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Name of the user commands act on behalf of.
    #[serde(default)]
    pub current_user_name: String,
    /// Poller configuration.
    #[serde(default)]
    pub poll: PollConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_db_url() -> String {
    "sqlite://gator.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: default_db_url(),
            current_user_name: String::new(),
            poll: PollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the configuration file path.
    ///
    /// `GATOR_CONFIG` wins; otherwise the file sits in the user's home
    /// directory.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        let dirs = directories::BaseDirs::new()
            .ok_or_else(|| GatorError::Config("cannot determine home directory".to_string()))?;
        Ok(dirs.home_dir().join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration, writing a default file first if none exists.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            tracing::info!("Config file created: {}", path.display());
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse configuration from a JSON string.
    pub fn parse(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Write the configuration to a JSON file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| GatorError::Config(format!("config encode error: {e}")))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Make `name` the current user and persist the change.
    pub fn set_user<P: AsRef<Path>>(&mut self, name: &str, path: P) -> Result<()> {
        self.current_user_name = name.to_string();
        self.save(path)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DB_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(db_url) = std::env::var(DB_URL_ENV) {
            if !db_url.is_empty() {
                self.db_url = db_url;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.db_url.trim().is_empty() {
            return Err(GatorError::Config("db_url is not set".to_string()));
        }
        if self.poll.min_interval_secs == 0 {
            return Err(GatorError::Config(
                "poll.min_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll.user_agent.trim().is_empty() {
            return Err(GatorError::Config("poll.user_agent is empty".to_string()));
        }
        Ok(())
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

        assert_eq!(config.poll.min_interval_secs, 5);
        assert_eq!(config.poll.min_interval(), Duration::from_secs(5));
        assert_eq!(config.poll.user_agent, "gator");
        assert_eq!(config.poll.connect_timeout_secs, 10);
        assert_eq!(config.poll.total_timeout_secs, 30);
        assert_eq!(config.poll.max_redirects, 5);
        assert_eq!(config.poll.max_feed_size_bytes, 5 * 1024 * 1024);
        assert!(config.poll.block_private_hosts);

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_parse_original_format() {
        let json = r#"{"db_url":"sqlite://data/gator.db","current_user_name":"kahya"}"#;
        let config = Config::parse(json).unwrap();

        assert_eq!(config.db_url, "sqlite://data/gator.db");
        assert_eq!(config.current_user_name, "kahya");
        assert_eq!(config.poll.min_interval_secs, 5);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"
{
    "db_url": "sqlite::memory:",
    "current_user_name": "holgith",
    "poll": {
        "min_interval_secs": 30,
        "user_agent": "gator-test",
        "connect_timeout_secs": 3,
        "total_timeout_secs": 7,
        "max_redirects": 1,
        "max_feed_size_bytes": 1024,
        "block_private_hosts": false
    },
    "logging": {
        "level": "debug",
        "file": "logs/gator.log"
    }
}
"#;
        let config = Config::parse(json).unwrap();

        assert_eq!(config.current_user_name, "holgith");
        assert_eq!(config.poll.min_interval_secs, 30);
        assert_eq!(config.poll.user_agent, "gator-test");
        assert_eq!(config.poll.connect_timeout_secs, 3);
        assert_eq!(config.poll.total_timeout_secs, 7);
        assert_eq!(config.poll.max_redirects, 1);
        assert_eq!(config.poll.max_feed_size_bytes, 1024);
        assert!(!config.poll.block_private_hosts);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("logs/gator.log"));
    }

    #[test]
    fn test_parse_empty_object() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config.db_url, "sqlite://gator.db");
        assert_eq!(config.poll.user_agent, "gator");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not json {");

        assert!(result.is_err());
        if let Err(GatorError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent-gatorconfig.json");
        assert!(matches!(result, Err(GatorError::Io(_))));
    }

    #[test]
    fn test_load_or_create_and_set_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert!(config.current_user_name.is_empty());

        config.set_user("lane", &path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.current_user_name, "lane");
        assert_eq!(reloaded.db_url, config.db_url);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.db_url = "  ".to_string();
        assert!(matches!(config.validate(), Err(GatorError::Config(_))));

        let mut config = Config::default();
        config.poll.min_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll.user_agent = String::new();
        assert!(config.validate().is_err());
    }
}
