//! BikeStream - Live cadence and speed from a BLE crank sensor
//!
//! Decodes Cycling Speed and Cadence notifications, turns crank revolution
//! counters into cadence, speed and distance, survives sensor reconnects and
//! resets, and relays every update to WebSocket dashboards.

pub mod integrations;
pub mod metrics;
pub mod sensors;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use integrations::streaming::MetricRelay;
pub use metrics::engine::CadenceEngine;
pub use metrics::types::MetricEvent;
pub use sensors::manager::SensorManager;
pub use session::CscSession;
pub use storage::config::AppConfig;
pub use storage::counter::RevolutionCounter;
