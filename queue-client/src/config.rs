//! Configuration loading for the draft queue.
//!
//! Configuration is loaded from a TOML file (default: `leadq.toml`). Every
//! field has a default, so a missing section or key is never an error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for the draft queue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Remote API configuration.
    #[serde(default)]
    pub api: ApiConfig,
    /// Connectivity monitoring configuration.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    /// Draft storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Synchronization behaviour.
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root (default: http://localhost:8080).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Create-lead endpoint path (default: /api/leads).
    #[serde(default = "default_leads_path")]
    pub leads_path: String,
    /// Reachability probe path (default: /api/health).
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Per-request timeout in milliseconds (default: 10000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Connectivity monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    /// Interval between reachability probes in milliseconds (default: 30000).
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    /// How long a change must hold before it is published, in milliseconds
    /// (default: 2000).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Draft storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the draft collection file (default: drafts.json).
    ///
    /// Relative paths are resolved against the data directory.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// How long to wait for another process to release the draft file, in
    /// milliseconds (default: 5000).
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
}

/// Synchronization behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    /// Run one sync pass on every offline→online transition (default: true).
    #[serde(default = "default_sync_on_reconnect")]
    pub sync_on_reconnect: bool,
    /// Remove drafts from the store as soon as they sync (default: false).
    #[serde(default)]
    pub prune_synced: bool,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_leads_path() -> String {
    "/api/leads".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_probe_interval_ms() -> u64 {
    30_000
}

fn default_debounce_ms() -> u64 {
    2_000
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("drafts.json")
}

fn default_lock_wait_ms() -> u64 {
    5_000
}

fn default_sync_on_reconnect() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            leads_path: default_leads_path(),
            health_path: default_health_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            lock_wait_ms: default_lock_wait_ms(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_on_reconnect: default_sync_on_reconnect(),
            prune_synced: false,
        }
    }
}

impl ApiConfig {
    /// Full URL of the create-lead endpoint.
    pub fn leads_url(&self) -> String {
        join_url(&self.base_url, &self.leads_path)
    }

    /// Full URL of the reachability probe.
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConnectivityConfig {
    /// Probe period.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    /// Debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl StorageConfig {
    /// Lock wait.
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }
}

impl QueueConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds a
    /// value the queue cannot run with.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Check values serde cannot.
    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let non_zero = |key, value: u64| {
            if value == 0 {
                Err(ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    key,
                    reason: "must be greater than zero",
                })
            } else {
                Ok(())
            }
        };
        non_zero(
            "connectivity.probe_interval_ms",
            self.connectivity.probe_interval_ms,
        )?;
        non_zero("api.timeout_ms", self.api.timeout_ms)
    }

    /// Set the draft file path.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.path = path.into();
        self
    }

    /// Resolve the draft file path against a data directory.
    pub fn storage_path_in(&self, data_dir: &Path) -> PathBuf {
        if self.storage.path.is_absolute() {
            self.storage.path.clone()
        } else {
            data_dir.join(&self.storage.path)
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A setting parsed but cannot be used.
    #[error("invalid {key} in {path}: {reason}")]
    InvalidValue {
        /// Path to the configuration file.
        path: PathBuf,
        /// Offending key.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}
