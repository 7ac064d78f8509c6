//! Cadence/speed engine.
//!
//! Turns successive crank counter snapshots into cadence, speed and
//! accumulated distance. All counters live in the 16-bit modulo domain the
//! sensor reports them in; rates are computed in floating point.

use crate::metrics::types::{EngineConfig, MetricEvent, COUNTER_MODULUS, CRANK_TICKS_PER_SECOND};
use crate::sensors::csc::CrankData;
use std::time::Instant;

/// Raw counters of the most recently accepted measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrankBaseline {
    /// Cumulative crank revolutions
    pub revolutions: u16,
    /// Last crank event time (1/1024 s ticks)
    pub event_time: u16,
}

impl From<CrankData> for CrankBaseline {
    fn from(crank: CrankData) -> Self {
        Self {
            revolutions: crank.revolutions,
            event_time: crank.event_time,
        }
    }
}

/// Mutable engine state for one logical sensor session.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    /// Baseline counters, `None` until the first measurement of the session
    pub baseline: Option<CrankBaseline>,
    /// Distance accumulated over the session in km
    pub cumulative_distance_km: f64,
    /// Most recent speed in km/h
    pub current_speed_kmh: f64,
    /// Most recent cadence in RPM
    pub current_cadence_rpm: f64,
    /// When the last delta was accepted
    pub last_update: Option<Instant>,
}

/// Result of feeding one measurement to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestOutcome {
    /// First measurement of the session, stored as the baseline
    Baseline,
    /// Duplicate or out-of-order packet; baseline advanced, nothing emitted
    Discarded,
    /// Delta accepted and an event produced
    Accepted(MetricEvent),
}

impl IngestOutcome {
    /// The emitted event, if any.
    pub fn event(&self) -> Option<MetricEvent> {
        match self {
            IngestOutcome::Accepted(event) => Some(*event),
            _ => None,
        }
    }
}

/// Difference between two revolution counters, signed over the 16-bit domain.
///
/// Forward wraps (65535 -> 2) count as progress; backward steps are negative.
pub fn revolution_delta(previous: u16, current: u16) -> i32 {
    current.wrapping_sub(previous) as i16 as i32
}

/// Difference between two crank event times in ticks, always in `1..=65536`.
///
/// A non-positive raw delta means the event clock wrapped.
pub fn event_time_delta(previous: u16, current: u16) -> i32 {
    let raw = current.wrapping_sub(previous) as i16 as i32;
    if raw <= 0 {
        raw + COUNTER_MODULUS
    } else {
        raw
    }
}

/// Stateful cadence, speed and distance calculator.
#[derive(Debug, Default)]
pub struct CadenceEngine {
    config: EngineConfig,
    state: EngineState,
}

impl CadenceEngine {
    /// Create a new engine.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::default(),
        }
    }

    /// Current engine state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Baseline counters, if the session has seen a measurement.
    pub fn baseline(&self) -> Option<CrankBaseline> {
        self.state.baseline
    }

    /// Most recent speed in km/h.
    pub fn current_speed_kmh(&self) -> f64 {
        self.state.current_speed_kmh
    }

    /// Distance accumulated over the session in km.
    pub fn cumulative_distance_km(&self) -> f64 {
        self.state.cumulative_distance_km
    }

    /// Feed a crank measurement through the normal delta path.
    pub fn ingest(&mut self, crank: CrankData, now: Instant) -> IngestOutcome {
        let Some(baseline) = self.state.baseline else {
            self.state.baseline = Some(crank.into());
            tracing::debug!(
                "Crank baseline set: {} revs @ {}",
                crank.revolutions,
                crank.event_time
            );
            return IngestOutcome::Baseline;
        };

        let delta_revs = revolution_delta(baseline.revolutions, crank.revolutions);
        if delta_revs <= 0 {
            // Advance anyway so a later duplicate cannot diff against stale counters
            self.state.baseline = Some(crank.into());
            tracing::debug!("Discarding stale crank packet (delta {})", delta_revs);
            return IngestOutcome::Discarded;
        }

        IngestOutcome::Accepted(self.apply_delta(crank, delta_revs as u32, now))
    }

    /// Accept `crank` with a revolution delta decided by the caller.
    ///
    /// Skips the duplicate check; the event-time wrap rule still applies
    /// against the current baseline (or tick zero when there is none).
    pub fn apply_delta(&mut self, crank: CrankData, delta_revs: u32, now: Instant) -> MetricEvent {
        let previous_time = self.state.baseline.map_or(0, |b| b.event_time);
        let delta_ticks = f64::from(event_time_delta(previous_time, crank.event_time));

        let delta_secs = delta_ticks / CRANK_TICKS_PER_SECOND;
        let cadence_rpm = f64::from(delta_revs) * 60.0 * CRANK_TICKS_PER_SECOND / delta_ticks;
        let speed_kmh = cadence_rpm * self.config.speed_factor;

        self.state.cumulative_distance_km += speed_kmh * delta_secs / 3600.0;
        self.state.current_speed_kmh = speed_kmh;
        self.state.current_cadence_rpm = cadence_rpm;
        self.state.last_update = Some(now);
        self.state.baseline = Some(crank.into());

        MetricEvent {
            delta_revolutions: delta_revs,
            cadence_rpm,
            speed_kmh,
            cumulative_distance_km: self.state.cumulative_distance_km,
        }
    }

    /// Force speed and cadence to zero.
    ///
    /// Returns the idle event, or `None` when motion is already zero.
    pub fn force_zero(&mut self) -> Option<MetricEvent> {
        if self.state.current_speed_kmh == 0.0 && self.state.current_cadence_rpm == 0.0 {
            return None;
        }

        self.state.current_speed_kmh = 0.0;
        self.state.current_cadence_rpm = 0.0;
        Some(MetricEvent::idle(self.state.cumulative_distance_km))
    }
}
