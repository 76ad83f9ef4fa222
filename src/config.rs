//! Application configuration
//!
//! Read from `PILOT_LOGBOOK_*` environment variables with defaults suitable
//! for a backend running on the local machine.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_API_URL: &str = "PILOT_LOGBOOK_API_URL";
const ENV_API_TOKEN: &str = "PILOT_LOGBOOK_API_TOKEN";
const ENV_USER_ID: &str = "PILOT_LOGBOOK_USER_ID";
const ENV_TIMEOUT: &str = "PILOT_LOGBOOK_TIMEOUT_SECS";
const ENV_BACKUP_DIR: &str = "PILOT_LOGBOOK_BACKUP_DIR";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the flight store API, without trailing slash
    pub api_url: String,
    /// Bearer token attached to every request
    pub api_token: Option<String>,
    /// Owner id used when scheduling flights
    pub user_id: Option<String>,
    pub request_timeout: Duration,
    /// Directory backups are written to
    pub backup_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            user_id: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            backup_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_API_URL) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    var: ENV_API_URL,
                    value: url,
                });
            }
            config.api_url = url.trim_end_matches('/').to_string();
        }

        config.api_token = get(ENV_API_TOKEN);
        config.user_id = get(ENV_USER_ID);

        if let Some(raw) = get(ENV_TIMEOUT) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: ENV_TIMEOUT,
                        value: raw,
                    })
                }
            }
        }

        if let Some(dir) = get(ENV_BACKUP_DIR) {
            config.backup_dir = PathBuf::from(dir);
        }

        log::info!(
            "Config: api_url={}, token={}, user_id={:?}, timeout={}s, backup_dir={}",
            config.api_url,
            if config.api_token.is_some() { "***" } else { "none" },
            config.user_id,
            config.request_timeout.as_secs(),
            config.backup_dir.display()
        );

        Ok(config)
    }
}
