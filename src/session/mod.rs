//! CSC metrics session.
//!
//! `CscSession` owns everything that mutates for one logical sensor:
//! the engine, the reconnect reconciler, the watchdog and the sinks. It is a
//! plain synchronous state machine; `actor` drives it from a single tokio
//! task so notifications and timer triggers never interleave.

pub mod actor;

use crate::metrics::engine::{CadenceEngine, IngestOutcome};
use crate::metrics::reconciler::{ReconnectKind, ReconnectReconciler};
use crate::metrics::sink::MetricSink;
use crate::metrics::types::{EngineConfig, MetricEvent, IDLE_POLL_INTERVAL, INACTIVITY_TIMEOUT};
use crate::metrics::watchdog::InactivityWatchdog;
use crate::sensors::csc::parse_csc_measurement;
use crate::sensors::types::{ConnectionPhase, SensorError};
use crate::storage::config::MetricsSettings;
use std::time::{Duration, Instant};

pub use actor::{spawn, SessionCommand, SessionHandle};

/// Floor for both session timers; a zero period is not a valid tokio interval.
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Tunables for one metrics session.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Engine coefficients
    pub engine: EngineConfig,
    /// Time without an accepted measurement before forcing zero motion
    pub inactivity_timeout: Duration,
    /// Period of the idle safety-net check
    pub idle_poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            inactivity_timeout: INACTIVITY_TIMEOUT,
            idle_poll_interval: IDLE_POLL_INTERVAL,
        }
    }
}

impl From<&MetricsSettings> for SessionConfig {
    fn from(settings: &MetricsSettings) -> Self {
        Self {
            engine: EngineConfig {
                speed_factor: settings.speed_factor,
            },
            inactivity_timeout: Duration::from_millis(settings.inactivity_timeout_ms)
                .max(MIN_TIMER_PERIOD),
            idle_poll_interval: Duration::from_millis(settings.idle_poll_interval_ms)
                .max(MIN_TIMER_PERIOD),
        }
    }
}

/// Decode → reconcile → engine → watchdog → sinks, for one sensor.
pub struct CscSession {
    config: SessionConfig,
    engine: CadenceEngine,
    reconciler: ReconnectReconciler,
    watchdog: InactivityWatchdog,
    sinks: Vec<Box<dyn MetricSink>>,
}

impl CscSession {
    /// Create a new session with no sinks attached.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            engine: CadenceEngine::new(config.engine),
            reconciler: ReconnectReconciler::new(),
            watchdog: InactivityWatchdog::new(config.inactivity_timeout),
            sinks: Vec::new(),
        }
    }

    /// Attach a sink. Events emitted before any sink is attached are lost.
    pub fn add_sink(&mut self, sink: impl MetricSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Engine state, read-only.
    pub fn engine(&self) -> &CadenceEngine {
        &self.engine
    }

    /// Inactivity watchdog, read-only.
    pub fn watchdog(&self) -> &InactivityWatchdog {
        &self.watchdog
    }

    /// Current connection phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.reconciler.phase()
    }

    /// Handle one raw CSC Measurement notification.
    ///
    /// Malformed frames return an error and leave all state untouched.
    /// Wheel-only frames, baselines and duplicates return `Ok(None)`.
    pub fn on_notification(
        &mut self,
        data: &[u8],
        now: Instant,
    ) -> Result<Option<MetricEvent>, SensorError> {
        let measurement = parse_csc_measurement(data)?;
        self.watchdog.record_packet(now);

        let Some(crank) = measurement.crank else {
            return Ok(None);
        };

        let (kind, outcome) = self.reconciler.route(&mut self.engine, crank, now);
        let IngestOutcome::Accepted(event) = outcome else {
            return Ok(None);
        };

        self.watchdog.arm(now);

        if kind == Some(ReconnectKind::SensorReset) {
            tracing::info!("Sensor counter reset detected, counting from zero");
        }
        tracing::debug!(
            "+{} rev | cadence {:.1} rpm | speed {:.1} km/h | dist {:.3} km",
            event.delta_revolutions,
            event.cadence_rpm,
            event.speed_kmh,
            event.cumulative_distance_km
        );

        self.emit(&event);
        Ok(Some(event))
    }

    /// The link started connecting.
    pub fn on_connecting(&mut self) {
        self.reconciler.on_connecting();
    }

    /// The link is connected.
    pub fn on_connected(&mut self) {
        self.reconciler.on_connected();
    }

    /// The link dropped. The watchdog keeps running so motion decays to zero.
    pub fn on_disconnected(&mut self) {
        self.reconciler.on_disconnected();
    }

    /// Single-shot deadline trigger.
    pub fn on_deadline(&mut self, now: Instant) -> Option<MetricEvent> {
        if !self.watchdog.poll_deadline(now) {
            return None;
        }

        tracing::info!("No movement, forcing speed to zero");
        self.force_zero()
    }

    /// Periodic safety-net trigger.
    pub fn on_idle_check(&mut self, now: Instant) -> Option<MetricEvent> {
        if !self.watchdog.is_idle(now) || self.engine.current_speed_kmh() == 0.0 {
            return None;
        }

        tracing::info!("Idle check found stale speed, forcing zero");
        self.force_zero()
    }

    /// Cancel pending timers; the session emits nothing after this.
    pub fn teardown(&mut self) {
        self.watchdog.cancel();
        self.sinks.clear();
    }

    fn force_zero(&mut self) -> Option<MetricEvent> {
        let event = self.engine.force_zero()?;
        self.emit(&event);
        Some(event)
    }

    fn emit(&mut self, event: &MetricEvent) {
        for sink in &mut self.sinks {
            sink.accept(event);
        }
    }
}

impl Default for CscSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
