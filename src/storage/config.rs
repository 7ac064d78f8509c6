//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory; every section
//! falls back to defaults when absent.

use crate::integrations::streaming::StreamingConfig;
use crate::metrics::types::{IDLE_POLL_INTERVAL, INACTIVITY_TIMEOUT, SPEED_FACTOR};
use crate::sensors::types::SensorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Sensor settings
    pub sensors: SensorSettings,
    /// Metric computation settings
    pub metrics: MetricsSettings,
    /// WebSocket streaming settings
    pub streaming: StreamingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            sensors: SensorSettings::default(),
            metrics: MetricsSettings::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

/// Sensor-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Peripheral id to connect to; any CSC sensor when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_device_id: Option<String>,
    /// Auto-reconnect on disconnect
    pub auto_reconnect: bool,
    /// Discovery timeout in seconds
    pub discovery_timeout_secs: u32,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u32,
    /// Pause before scanning again after a disconnect
    pub reconnect_delay_secs: u32,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            target_device_id: None,
            auto_reconnect: true,
            discovery_timeout_secs: 30,
            connection_timeout_secs: 10,
            reconnect_delay_secs: 2,
        }
    }
}

impl From<&SensorSettings> for SensorConfig {
    fn from(settings: &SensorSettings) -> Self {
        Self {
            target_device_id: settings.target_device_id.clone(),
            discovery_timeout_secs: u64::from(settings.discovery_timeout_secs),
            connection_timeout_secs: u64::from(settings.connection_timeout_secs),
            auto_reconnect: settings.auto_reconnect,
            reconnect_delay_secs: u64::from(settings.reconnect_delay_secs),
        }
    }
}

/// Metric computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// km/h per crank RPM
    pub speed_factor: f64,
    /// Force zero motion after this long without an accepted measurement
    pub inactivity_timeout_ms: u64,
    /// Idle safety-net check period
    pub idle_poll_interval_ms: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            speed_factor: SPEED_FACTOR,
            inactivity_timeout_ms: INACTIVITY_TIMEOUT.as_millis() as u64,
            idle_poll_interval_ms: IDLE_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "bikestream", "BikeStream")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load application configuration from `path`, defaulting when missing.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        let config = AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        return Ok(config);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save application configuration to `path`.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
