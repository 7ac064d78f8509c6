//! Metric event and engine configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Linear crank-cadence to road-speed coefficient (km/h per RPM).
///
/// There is no gear-ratio model; every cadence maps to one speed.
pub const SPEED_FACTOR: f64 = 0.33;

/// Crank event time resolution (ticks per second).
pub const CRANK_TICKS_PER_SECOND: f64 = 1024.0;

/// Size of the 16-bit counter domain.
pub const COUNTER_MODULUS: i32 = 65_536;

/// Time without an accepted measurement before motion is forced to zero.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Period of the idle safety-net check.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Derived motion metrics for one accepted measurement or forced idle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricEvent {
    /// Crank revolutions since the previous event
    pub delta_revolutions: u32,
    /// Pedaling rate in RPM
    pub cadence_rpm: f64,
    /// Estimated speed in km/h
    pub speed_kmh: f64,
    /// Distance accumulated over the session in km
    pub cumulative_distance_km: f64,
}

impl MetricEvent {
    /// Zero-motion event that keeps the accumulated distance.
    pub fn idle(cumulative_distance_km: f64) -> Self {
        Self {
            cumulative_distance_km,
            ..Default::default()
        }
    }

    /// True for the forced zero-motion event.
    pub fn is_idle(&self) -> bool {
        self.delta_revolutions == 0 && self.cadence_rpm == 0.0 && self.speed_kmh == 0.0
    }
}

/// Configuration for the cadence engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// km/h per RPM
    pub speed_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            speed_factor: SPEED_FACTOR,
        }
    }
}
