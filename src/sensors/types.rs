//! Sensor types and errors for the BLE CSC link.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection phase of the CSC sensor link.
///
/// `Connecting` is only entered from `Disconnected`; a discovery that arrives
/// while a connection is in flight or established is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Not connected
    #[default]
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Active connection
    Connected,
}

impl ConnectionPhase {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConnectionPhase) -> bool {
        matches!(
            (self, next),
            (ConnectionPhase::Disconnected, ConnectionPhase::Connecting)
                | (ConnectionPhase::Connecting, ConnectionPhase::Connected)
                | (ConnectionPhase::Connecting, ConnectionPhase::Disconnected)
                | (ConnectionPhase::Connected, ConnectionPhase::Disconnected)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(&mut self, next: ConnectionPhase) -> Result<(), SensorError> {
        if !self.can_transition_to(next) {
            return Err(SensorError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionPhase::Disconnected => write!(f, "Disconnected"),
            ConnectionPhase::Connecting => write!(f, "Connecting..."),
            ConnectionPhase::Connected => write!(f, "Connected"),
        }
    }
}

/// Configuration for the sensor manager.
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// Only connect to this peripheral id (any CSC sensor when `None`)
    pub target_device_id: Option<String>,
    /// Timeout for discovery scan in seconds
    pub discovery_timeout_secs: u64,
    /// Timeout for connection attempt in seconds
    pub connection_timeout_secs: u64,
    /// Whether to auto-reconnect on disconnect
    pub auto_reconnect: bool,
    /// Delay between reconnection attempts in seconds
    pub reconnect_delay_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            target_device_id: None,
            discovery_timeout_secs: 30,
            connection_timeout_secs: 10,
            auto_reconnect: true,
            reconnect_delay_secs: 2,
        }
    }
}

/// Errors that can occur in the sensor system.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Notification is shorter than its flags declare
    #[error("Malformed CSC frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    /// Connection phase change that the link does not allow
    #[error("Invalid connection transition: {from} -> {to}")]
    InvalidTransition {
        from: ConnectionPhase,
        to: ConnectionPhase,
    },

    /// BLE adapter not found or unavailable
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// Failed to start BLE scanning
    #[error("Failed to start scanning: {0}")]
    ScanFailed(String),

    /// No matching sensor was seen before the discovery timeout
    #[error("No CSC sensor found within {0} seconds")]
    ScanTimeout(u64),

    /// Connection to sensor failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timed out
    #[error("Connection timed out")]
    ConnectionTimeout,

    /// Sensor does not expose the CSC Measurement characteristic
    #[error("CSC Measurement characteristic not found")]
    CharacteristicNotFound,

    /// Failed to subscribe to sensor notifications
    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    /// The metrics session is no longer running
    #[error("Metrics session closed")]
    SessionClosed,

    /// Generic BLE error
    #[error("BLE error: {0}")]
    BleError(String),
}
