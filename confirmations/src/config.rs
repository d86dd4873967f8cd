//! Protocol configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bat_types::Environment;
use bat_utils::{Backoff, LogFormat};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the confirmations client.
///
/// Loaded from a TOML file via [`ConfirmationsConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Passed explicitly to every
/// component that needs it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationsConfig {
    /// Which payment service deployment to use.
    #[serde(default)]
    pub environment: Environment,

    /// Overrides the environment's service base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,

    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Refill when fewer spendable tokens than this remain.
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,

    /// Refill up to this many spendable tokens.
    #[serde(default = "default_high_water_mark")]
    pub high_water_mark: usize,

    /// Top up the pool in the background when a confirmation drops it
    /// below the low-water mark.
    #[serde(default = "default_auto_refill")]
    pub auto_refill: bool,

    /// Attempts per network exchange before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./bat_data")
}

fn default_low_water_mark() -> usize {
    20
}

fn default_high_water_mark() -> usize {
    50
}

fn default_auto_refill() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ConfirmationsConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_water_mark == 0 {
            return Err(ConfigError::Invalid("high_water_mark must be positive".into()));
        }
        if self.low_water_mark > self.high_water_mark {
            return Err(ConfigError::Invalid(format!(
                "low_water_mark {} exceeds high_water_mark {}",
                self.low_water_mark, self.high_water_mark
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be positive".into()));
        }
        if let Some(url) = &self.service_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!("service_url {url} is not http(s)")));
            }
        }
        Ok(())
    }

    /// The service base URL, without a trailing slash.
    pub fn service_url(&self) -> String {
        self.service_url
            .as_deref()
            .unwrap_or(self.environment.default_service_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ConfirmationsConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            service_url: None,
            data_dir: default_data_dir(),
            low_water_mark: default_low_water_mark(),
            high_water_mark: default_high_water_mark(),
            auto_refill: default_auto_refill(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ConfirmationsConfig::default();
        let parsed = ConfirmationsConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ConfirmationsConfig::from_toml_str("").unwrap();
        assert_eq!(config.low_water_mark, 20);
        assert_eq!(config.high_water_mark, 50);
        assert_eq!(config.max_attempts, 3);
        assert!(config.auto_refill);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            environment = "production"
            service_url = "https://payments.example.com/"
            low_water_mark = 5
            log_format = "json"
        "#;
        let config = ConfirmationsConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.service_url(), "https://payments.example.com");
        assert_eq!(config.low_water_mark, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn environment_picks_service_url() {
        let config = ConfirmationsConfig {
            environment: Environment::Staging,
            ..Default::default()
        };
        assert_eq!(config.service_url(), "https://ads-serve.bravesoftware.com");
    }

    #[test]
    fn validation_rules() {
        let bad = [
            ConfirmationsConfig { high_water_mark: 0, low_water_mark: 0, ..Default::default() },
            ConfirmationsConfig { low_water_mark: 60, ..Default::default() },
            ConfirmationsConfig { max_attempts: 0, ..Default::default() },
            ConfirmationsConfig { service_url: Some("ftp://x".into()), ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn unknown_environment_is_parse_error() {
        assert!(matches!(
            ConfirmationsConfig::from_toml_str("environment = \"moon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_returns_io_error() {
        let result = ConfirmationsConfig::from_toml_file(Path::new("/nonexistent/bat.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bat.toml");
        std::fs::write(&path, "high_water_mark = 10\nlow_water_mark = 2\n").unwrap();
        let config = ConfirmationsConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.high_water_mark, 10);
    }
}
