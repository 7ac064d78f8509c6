//! Sensor module for the BLE Cycling Speed and Cadence link.

pub mod csc;
pub mod manager;
pub mod types;

pub use csc::{parse_csc_measurement, CrankData, CscMeasurement};
pub use manager::SensorManager;
pub use types::{ConnectionPhase, SensorConfig, SensorError};
