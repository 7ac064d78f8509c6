//! WebSocket Streaming for External Display
//!
//! Relays live ride metrics to browser dashboards.

pub mod server;

use crate::metrics::types::MetricEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export main types
pub use server::MetricRelay;

/// Greeting sent to every new client.
pub const WELCOME_MESSAGE: &str = "Welcome to the BikeStream relay!";

/// Streaming-related errors
#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("Streaming is disabled")]
    Disabled,

    #[error("Server bind failed: {0}")]
    BindFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Whether streaming is enabled
    pub enabled: bool,
    /// Address to listen on
    pub bind_address: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl StreamingConfig {
    /// `host:port` listen address.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// JSON message sent to streaming clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Greeting on connect
    Welcome { msg: String },
    /// Snapshot sent once after the greeting
    #[serde(rename_all = "camelCase")]
    State {
        counter: u64,
        distance_km: f64,
        speed_kmh: f64,
    },
    /// One metric event
    #[serde(rename_all = "camelCase")]
    Metrics {
        delta_revs: u32,
        cadence_rpm: f64,
        speed_kmh: f64,
        distance_km: f64,
    },
}

impl StreamMessage {
    /// The standard greeting.
    pub fn welcome() -> Self {
        StreamMessage::Welcome {
            msg: WELCOME_MESSAGE.to_string(),
        }
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, StreamingError> {
        serde_json::to_string(self).map_err(|e| StreamingError::SerializeError(e.to_string()))
    }
}

impl From<&MetricEvent> for StreamMessage {
    fn from(event: &MetricEvent) -> Self {
        StreamMessage::Metrics {
            delta_revs: event.delta_revolutions,
            cadence_rpm: event.cadence_rpm,
            speed_kmh: event.speed_kmh,
            distance_km: event.cumulative_distance_km,
        }
    }
}
