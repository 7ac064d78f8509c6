//! Unit tests for cadence, speed and distance derivation.

use bikestream::metrics::engine::{event_time_delta, revolution_delta, CadenceEngine, IngestOutcome};
use bikestream::metrics::types::EngineConfig;
use bikestream::sensors::csc::CrankData;
use std::time::Instant;

fn crank(revolutions: u16, event_time: u16) -> CrankData {
    CrankData {
        revolutions,
        event_time,
    }
}

#[test]
fn test_first_packet_sets_baseline_only() {
    let mut engine = CadenceEngine::default();
    let outcome = engine.ingest(crank(500, 1024), Instant::now());

    assert_eq!(outcome, IngestOutcome::Baseline);
    assert!(outcome.event().is_none());
    assert_eq!(engine.baseline().map(|b| b.revolutions), Some(500));
    assert_eq!(engine.cumulative_distance_km(), 0.0);
}

#[test]
fn test_three_revolutions_in_one_second() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(0, 0), now);

    let event = engine.ingest(crank(3, 1024), now).event().unwrap();

    assert_eq!(event.delta_revolutions, 3);
    assert!((event.cadence_rpm - 180.0).abs() < 1e-9);
    assert!((event.speed_kmh - 59.4).abs() < 1e-9);
    assert!((event.cumulative_distance_km - 59.4 / 3600.0).abs() < 1e-12);
}

#[test]
fn test_three_revolutions_from_mid_session_baseline() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    assert_eq!(engine.ingest(crank(100, 1024), now), IngestOutcome::Baseline);

    let event = engine.ingest(crank(103, 2048), now).event().unwrap();

    assert_eq!(event.delta_revolutions, 3);
    assert!((event.cadence_rpm - 180.0).abs() < 1e-9);
    assert!((event.speed_kmh - 180.0 * 0.33).abs() < 1e-9);
    assert!((engine.state().current_cadence_rpm - 180.0).abs() < 1e-9);
}

#[test]
fn test_event_time_wrap_in_cadence() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(10, 65000), now);

    // 636 ticks after the wrap
    let event = engine.ingest(crank(11, 100), now).event().unwrap();
    let expected = 60.0 * 1024.0 / 636.0;
    assert!((event.cadence_rpm - expected).abs() < 1e-9);
}

#[test]
fn test_revolution_wrap_counts_forward() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(65535, 0), now);

    let event = engine.ingest(crank(2, 1024), now).event().unwrap();
    assert_eq!(event.delta_revolutions, 3);
}

#[test]
fn test_duplicate_packet_discarded() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(100, 1024), now);
    engine.ingest(crank(101, 2048), now);

    assert_eq!(engine.ingest(crank(101, 2048), now), IngestOutcome::Discarded);
    // Next real packet diffs against the duplicate
    let event = engine.ingest(crank(103, 3072), now).event().unwrap();
    assert_eq!(event.delta_revolutions, 2);
}

#[test]
fn test_backward_step_discarded_and_advances_baseline() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(100, 1024), now);

    assert_eq!(engine.ingest(crank(90, 2048), now), IngestOutcome::Discarded);
    assert_eq!(engine.baseline().map(|b| b.revolutions), Some(90));
}

#[test]
fn test_distance_is_monotonic() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(0, 0), now);

    let mut last = 0.0;
    for i in 1..=20u16 {
        if let Some(event) = engine.ingest(crank(i * 2, i * 1024), now).event() {
            assert!(event.cumulative_distance_km >= last);
            last = event.cumulative_distance_km;
        }
    }
    assert!(last > 0.0);
}

#[test]
fn test_speed_factor_is_configurable() {
    let mut engine = CadenceEngine::new(EngineConfig { speed_factor: 0.5 });
    let now = Instant::now();
    engine.ingest(crank(0, 0), now);

    let event = engine.ingest(crank(1, 1024), now).event().unwrap();
    assert!((event.speed_kmh - 30.0).abs() < 1e-9);
}

#[test]
fn test_force_zero_keeps_distance() {
    let mut engine = CadenceEngine::default();
    let now = Instant::now();
    engine.ingest(crank(0, 0), now);
    let moving = engine.ingest(crank(3, 1024), now).event().unwrap();

    let idle = engine.force_zero().unwrap();
    assert!(idle.is_idle());
    assert_eq!(idle.cumulative_distance_km, moving.cumulative_distance_km);
    assert!(engine.force_zero().is_none());
}

#[test]
fn test_delta_helpers() {
    assert_eq!(revolution_delta(500, 520), 20);
    assert_eq!(revolution_delta(520, 500), -20);
    assert_eq!(revolution_delta(65535, 0), 1);
    assert_eq!(event_time_delta(65000, 100), 636);
    assert_eq!(event_time_delta(7, 7), 65536);
}
