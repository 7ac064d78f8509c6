//! Reconnection reconciler.
//!
//! Decides how the first crank measurement after a reconnect is read. The
//! CSC wire format cannot tell a long outage with an intact counter from a
//! sensor-side counter reset, so the ordering of the counters decides:
//! a counter at or above the old baseline counts as revolutions missed
//! while disconnected, anything lower as a reset counting up from zero.
//! A counter that wrapped past 65535 during the outage is read as a reset.

use crate::metrics::engine::{CadenceEngine, IngestOutcome};
use crate::sensors::csc::CrankData;
use crate::sensors::types::ConnectionPhase;
use std::time::Instant;

/// How a post-reconnect measurement was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectKind {
    /// Counter still ahead of the baseline; the gap was ridden while offline
    MissedRevolutions,
    /// Counter fell below the baseline; the sensor restarted from zero
    SensorReset,
}

/// Tracks connection phases and routes the first post-reconnect measurement.
#[derive(Debug, Default)]
pub struct ReconnectReconciler {
    /// Current connection phase
    phase: ConnectionPhase,
    /// A connection has been established at least once
    has_connected: bool,
    /// Next crank measurement is the first after a reconnect
    just_reconnected: bool,
}

impl ReconnectReconciler {
    /// Create a new reconciler in the `Disconnected` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection phase.
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Whether the next crank measurement will be reconciled.
    pub fn is_pending(&self) -> bool {
        self.just_reconnected
    }

    /// The link started connecting.
    pub fn on_connecting(&mut self) {
        if let Err(e) = self.phase.transition(ConnectionPhase::Connecting) {
            tracing::warn!("Ignoring connecting notice: {}", e);
        }
    }

    /// The link is connected.
    ///
    /// Coming from `Disconnected` the `Connecting` step is implied.
    pub fn on_connected(&mut self) {
        match self.phase {
            ConnectionPhase::Connected => {
                tracing::warn!("Ignoring duplicate connected notice");
                return;
            }
            ConnectionPhase::Disconnected | ConnectionPhase::Connecting => {}
        }

        self.phase = ConnectionPhase::Connected;
        if self.has_connected {
            self.just_reconnected = true;
            tracing::info!("Sensor reconnected, next crank packet will be reconciled");
        }
        self.has_connected = true;
    }

    /// The link dropped.
    pub fn on_disconnected(&mut self) {
        if self.phase == ConnectionPhase::Disconnected {
            return;
        }
        self.phase = ConnectionPhase::Disconnected;
    }

    /// Route one crank measurement to the engine.
    ///
    /// Returns the reconnect interpretation when this was the reconciled
    /// packet, alongside the engine outcome.
    pub fn route(
        &mut self,
        engine: &mut CadenceEngine,
        crank: CrankData,
        now: Instant,
    ) -> (Option<ReconnectKind>, IngestOutcome) {
        if !self.just_reconnected {
            return (None, engine.ingest(crank, now));
        }
        self.just_reconnected = false;

        let Some(baseline) = engine.baseline() else {
            // Previous session never produced a packet
            return (None, engine.ingest(crank, now));
        };

        let (kind, delta_revs) = if crank.revolutions >= baseline.revolutions {
            (
                ReconnectKind::MissedRevolutions,
                u32::from(crank.revolutions - baseline.revolutions),
            )
        } else {
            (ReconnectKind::SensorReset, u32::from(crank.revolutions))
        };

        tracing::info!(
            "Reconciled reconnect as {:?}: {} -> {} revs (+{})",
            kind,
            baseline.revolutions,
            crank.revolutions,
            delta_revs
        );

        let event = engine.apply_delta(crank, delta_revs, now);
        (Some(kind), IngestOutcome::Accepted(event))
    }
}
