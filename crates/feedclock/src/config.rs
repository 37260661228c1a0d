//! Configuration management for feedclock.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "feedclock";

/// Default state database file name.
const STATE_FILE_NAME: &str = "timer.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FEEDCLOCK_`, sections split on
///    `__`, e.g. `FEEDCLOCK_API__BASE_URL`)
/// 2. TOML config file at `~/.config/feedclock/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feeding-log API configuration.
    pub api: ApiConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Timer configuration.
    pub timer: TimerConfig,
}

/// Feeding-log API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the feeding log, without the `/api/feedings` path.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the timer state database.
    /// Defaults to `~/.local/share/feedclock/timer.db`
    pub state_path: Option<PathBuf>,
}

/// Timer-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Display refresh interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Minimum aggregated per-side duration (ms) that produces a log entry.
    pub noise_threshold_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            noise_threshold_ms: crate::reconcile::DEFAULT_NOISE_THRESHOLD_MS.unsigned_abs(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FEEDCLOCK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FEEDCLOCK_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(Error::ConfigValidation {
                message: "api.base_url must not be empty".to_string(),
            });
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(Error::ConfigValidation {
                message: format!("api.base_url must be an http(s) URL: {}", self.api.base_url),
            });
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "api.timeout_secs must be greater than 0".to_string(),
            });
        }
        if self.timer.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "timer.tick_interval_ms must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Get the state database path, resolving defaults if not set.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.storage
            .state_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STATE_FILE_NAME))
    }

    /// Get the display refresh interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.timer.tick_interval_ms)
    }

    /// Get the API request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Get the noise threshold in signed milliseconds, as reconciliation
    /// consumes it.
    #[must_use]
    pub fn noise_threshold_ms(&self) -> i64 {
        i64::try_from(self.timer.noise_threshold_ms).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.storage.state_path.is_none());
        assert_eq!(config.timer.tick_interval_ms, 1_000);
        assert_eq!(config.timer.noise_threshold_ms, 1_000);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_non_http_base_url() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http(s)"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.timer.tick_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms"));
    }

    #[test]
    fn test_state_path_default() {
        let config = Config::default();
        let path = config.state_path();
        assert!(path.to_string_lossy().contains("timer.db"));
        assert!(path.to_string_lossy().contains("feedclock"));
    }

    #[test]
    fn test_state_path_custom() {
        let mut config = Config::default();
        config.storage.state_path = Some(PathBuf::from("/custom/path/timer.db"));
        assert_eq!(config.state_path(), PathBuf::from("/custom/path/timer.db"));
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(1_000));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.noise_threshold_ms(), 1_000);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("feedclock"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config_uses_defaults() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://babytracker.local:8000\"\n\n[timer]\ntick_interval_ms = 250\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.api.base_url, "http://babytracker.local:8000");
        assert_eq!(config.timer.tick_interval_ms, 250);
        // Untouched sections keep their defaults
        assert_eq!(config.timer.noise_threshold_ms, 1_000);
    }

    #[test]
    fn test_config_serialize_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("base_url"));
        assert!(json.contains("noise_threshold_ms"));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
