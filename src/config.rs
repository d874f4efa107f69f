//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - rowrecord.toml (default configuration)
//! - rowrecord.local.toml (git-ignored local overrides)
//! - Environment variables (ROWRECORD_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # rowrecord.toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [records]
//! load_limit = 1
//! notify_multiple_rows = false
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! ROWRECORD_LOGGING__LEVEL=trace
//! ROWRECORD_RECORDS__LOAD_LIMIT=1
//! ```

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub records: RecordConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Behaviour of record operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// LIMIT appended to single-row loads and existence checks (0 = none)
    #[serde(default)]
    pub load_limit: u64,

    /// Log a warning when a single-row load matches several rows
    #[serde(default = "default_notify_multiple_rows")]
    pub notify_multiple_rows: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_notify_multiple_rows() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        RecordConfig {
            load_limit: 0,
            notify_multiple_rows: default_notify_multiple_rows(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. rowrecord.toml (base configuration)
    /// 2. rowrecord.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (ROWRECORD_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("rowrecord.toml"))
            .merge(Toml::file("rowrecord.local.toml"))
            .merge(Env::prefixed("ROWRECORD_").split("__"))
            .extract()
    }

    /// Load configuration from specific file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ROWRECORD_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert!(config.logging.file.is_none());
        assert_eq!(config.records.load_limit, 0);
        assert!(config.records.notify_multiple_rows);
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: Config = Figment::new()
            .merge(Toml::string("[records]\nload_limit = 1\n"))
            .extract()
            .unwrap();
        assert_eq!(config.records.load_limit, 1);
        assert!(config.records.notify_multiple_rows);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_json_format_detection() {
        let mut logging = LoggingConfig::default();
        assert!(!logging.is_json());
        logging.format = "JSON".to_string();
        assert!(logging.is_json());
    }
}
