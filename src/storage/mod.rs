//! Storage module for configuration and the persistent revolution counter.

pub mod config;
pub mod counter;

pub use config::{AppConfig, ConfigError, MetricsSettings, SensorSettings};
pub use counter::{CounterError, RevolutionCounter, SharedCounter};
