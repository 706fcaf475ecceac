//! Application-level configuration loading: storage backend selection and engine limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TICTACTOE_BACK_CONFIG_PATH";
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Persistence backend the server connects to at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart.
    #[default]
    Memory,
    /// MongoDB, configured through `MONGO_URI` / `MONGO_DB`.
    Mongo,
    /// CouchDB, configured through `COUCH_BASE_URL` / `COUCH_DB`.
    Couch,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    storage: StorageBackend,
    operation_timeout: Option<Duration>,
    event_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        storage = ?config.storage,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document; absent fields keep their defaults.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Storage backend to start with.
    pub fn storage(&self) -> StorageBackend {
        self.storage
    }

    /// Upper bound for a single engine operation; `None` disables the limit.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    /// Buffered events per SSE subscriber before slow clients start lagging.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Same configuration with a different operation timeout.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    storage: StorageBackend,
    /// `0` disables the timeout.
    operation_timeout_ms: u64,
    event_capacity: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            storage: value.storage,
            operation_timeout: (value.operation_timeout_ms > 0)
                .then(|| Duration::from_millis(value.operation_timeout_ms)),
            event_capacity: value.event_capacity.max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"storage": "mongo"}"#).unwrap();
        assert_eq!(config.storage(), StorageBackend::Mongo);
        assert_eq!(
            config.operation_timeout(),
            Some(Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS))
        );
        assert_eq!(config.event_capacity(), DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn zero_timeout_disables_limit() {
        let config = AppConfig::from_json(r#"{"operation_timeout_ms": 0}"#).unwrap();
        assert_eq!(config.operation_timeout(), None);
        assert_eq!(config.storage(), StorageBackend::Memory);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(AppConfig::from_json(r#"{"storage": "redis"}"#).is_err());
    }
}
