//! Unit tests for reconnect reconciliation.

use bikestream::metrics::engine::{CadenceEngine, IngestOutcome};
use bikestream::metrics::reconciler::{ReconnectKind, ReconnectReconciler};
use bikestream::sensors::csc::CrankData;
use bikestream::sensors::types::ConnectionPhase;
use std::time::Instant;

fn crank(revolutions: u16, event_time: u16) -> CrankData {
    CrankData {
        revolutions,
        event_time,
    }
}

fn connect(reconciler: &mut ReconnectReconciler) {
    reconciler.on_connecting();
    reconciler.on_connected();
}

fn reconnect(reconciler: &mut ReconnectReconciler) {
    reconciler.on_disconnected();
    connect(reconciler);
}

#[test]
fn test_first_connection_is_not_a_reconnect() {
    let mut reconciler = ReconnectReconciler::new();
    let mut engine = CadenceEngine::default();
    connect(&mut reconciler);

    assert!(!reconciler.is_pending());
    let (kind, outcome) = reconciler.route(&mut engine, crank(500, 0), Instant::now());
    assert_eq!(kind, None);
    assert_eq!(outcome, IngestOutcome::Baseline);
}

#[test]
fn test_missed_revolutions_after_reconnect() {
    let mut reconciler = ReconnectReconciler::new();
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    connect(&mut reconciler);
    reconciler.route(&mut engine, crank(500, 0), now);

    reconnect(&mut reconciler);
    assert!(reconciler.is_pending());

    let (kind, outcome) = reconciler.route(&mut engine, crank(520, 10240), now);
    assert_eq!(kind, Some(ReconnectKind::MissedRevolutions));
    assert_eq!(outcome.event().unwrap().delta_revolutions, 20);
    assert!(!reconciler.is_pending());
}

#[test]
fn test_sensor_reset_after_reconnect() {
    let mut reconciler = ReconnectReconciler::new();
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    connect(&mut reconciler);
    reconciler.route(&mut engine, crank(500, 0), now);

    reconnect(&mut reconciler);
    let (kind, outcome) = reconciler.route(&mut engine, crank(10, 1024), now);

    assert_eq!(kind, Some(ReconnectKind::SensorReset));
    assert_eq!(outcome.event().unwrap().delta_revolutions, 10);
    assert_eq!(engine.baseline().map(|b| b.revolutions), Some(10));
}

#[test]
fn test_only_first_packet_is_reconciled() {
    let mut reconciler = ReconnectReconciler::new();
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    connect(&mut reconciler);
    reconciler.route(&mut engine, crank(500, 0), now);

    reconnect(&mut reconciler);
    reconciler.route(&mut engine, crank(520, 1024), now);

    // Back to normal duplicate handling
    let (kind, outcome) = reconciler.route(&mut engine, crank(520, 1024), now);
    assert_eq!(kind, None);
    assert_eq!(outcome, IngestOutcome::Discarded);
}

#[test]
fn test_reconnect_without_baseline_uses_first_packet_rule() {
    let mut reconciler = ReconnectReconciler::new();
    let mut engine = CadenceEngine::default();
    connect(&mut reconciler);
    reconnect(&mut reconciler);

    let (kind, outcome) = reconciler.route(&mut engine, crank(42, 0), Instant::now());
    assert_eq!(kind, None);
    assert_eq!(outcome, IngestOutcome::Baseline);
}

#[test]
fn test_phase_tracking() {
    let mut reconciler = ReconnectReconciler::new();
    assert_eq!(reconciler.phase(), ConnectionPhase::Disconnected);

    reconciler.on_connecting();
    assert_eq!(reconciler.phase(), ConnectionPhase::Connecting);

    reconciler.on_connected();
    assert_eq!(reconciler.phase(), ConnectionPhase::Connected);

    reconciler.on_disconnected();
    assert_eq!(reconciler.phase(), ConnectionPhase::Disconnected);
}
