//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                           │
//! │                                                                     │
//! │  1. Environment Variables (highest priority)                        │
//! │     RACKLINE_REMOTE_ENDPOINT=https://api.example.com/pos            │
//! │     RACKLINE_DEVICE_ID=abc-123                                      │
//! │                                                                     │
//! │  2. TOML Config File                                                │
//! │     ~/.config/rackline-pos/sync.toml (Linux)                        │
//! │                                                                     │
//! │  3. Default Values (lowest priority)                                │
//! │     auto-generated device_id, 30s health interval, 3 attempts       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Register 1"
//!
//! [remote]
//! endpoint = "https://api.example.com/pos"
//! health_url = "https://api.example.com/pos/health"
//! request_timeout_secs = 10
//!
//! [sync]
//! enabled = true
//! health_interval_secs = 30
//! poll_interval_secs = 30
//! max_attempts = 3
//! backoff_base_ms = 1000
//! max_backoff_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Register 1", "Back Office").
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "POS Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Remote Store Configuration
// =============================================================================

/// Where transactions are submitted and reachability is probed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote transaction sink.
    /// Transactions are PUT to `{endpoint}/transactions/{id}`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// URL for the lightweight health-check request.
    /// Defaults to `{endpoint}/health` when unset.
    #[serde(default)]
    pub health_url: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

impl RemoteConfig {
    /// Resolves the health-check URL (explicit, or derived from endpoint).
    pub fn resolved_health_url(&self) -> Option<String> {
        self.health_url.clone().or_else(|| {
            self.endpoint
                .as_ref()
                .map(|e| format!("{}/health", e.trim_end_matches('/')))
        })
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Master switch; false disables the agent entirely (local-only mode).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between active health probes while the link is up (seconds).
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    /// Interval between queue poll cycles while online (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Submission attempts per transaction per cycle before marking it
    /// failed. Must be at least 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff before the second attempt (milliseconds); doubles each
    /// pass: base * 2^(attempt-1).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Cap on the backoff delay (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_health_interval() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base() -> u64 {
    1000
}
fn default_max_backoff() -> u64 {
    60
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            enabled: true,
            health_interval_secs: default_health_interval(),
            poll_interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device-specific configuration.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Remote store configuration.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Sync behavior settings.
    #[serde(default)]
    pub sync: SyncSettings,
}

impl SyncConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
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
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        for url in [self.remote.endpoint.as_ref(), self.remote.health_url.as_ref()]
            .into_iter()
            .flatten()
        {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(SyncError::InvalidUrl(format!(
                    "URL must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.sync.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }

        if self.sync.backoff_base_ms == 0 {
            return Err(SyncError::InvalidConfig(
                "backoff_base_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("RACKLINE_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Ok(name) = std::env::var("RACKLINE_DEVICE_NAME") {
            self.device.name = name;
        }

        if let Ok(endpoint) = std::env::var("RACKLINE_REMOTE_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding remote endpoint from environment");
            self.remote.endpoint = Some(endpoint);
        }

        if let Ok(url) = std::env::var("RACKLINE_HEALTH_URL") {
            self.remote.health_url = Some(url);
        }

        if let Ok(enabled) = std::env::var("RACKLINE_SYNC_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sync.enabled = true,
                "0" | "false" | "no" => self.sync.enabled = false,
                other => warn!(value = %other, "Unknown RACKLINE_SYNC_ENABLED value"),
            }
        }

        if let Ok(attempts) = std::env::var("RACKLINE_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse::<u32>() {
                self.sync.max_attempts = n;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "rackline", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns true if sync is enabled.
    pub fn is_sync_enabled(&self) -> bool {
        self.sync.enabled
    }

    /// Returns the remote endpoint if configured.
    pub fn endpoint(&self) -> Option<&str> {
        self.remote.endpoint.as_deref()
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout_secs)
    }

    /// Interval between health probes.
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.sync.health_interval_secs)
    }

    /// Interval between queue poll cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    /// Base backoff delay.
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.sync.backoff_base_ms)
    }

    /// Backoff delay cap.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.sync.max_backoff_secs)
    }
}
