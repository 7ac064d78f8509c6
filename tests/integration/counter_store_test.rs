//! Persistent revolution counter tests.

use bikestream::metrics::sink::{CounterSink, MetricSink};
use bikestream::metrics::types::MetricEvent;
use bikestream::storage::counter::RevolutionCounter;
use tempfile::tempdir;

fn event(delta_revolutions: u32) -> MetricEvent {
    MetricEvent {
        delta_revolutions,
        cadence_rpm: 90.0,
        speed_kmh: 29.7,
        cumulative_distance_km: 0.1,
    }
}

#[test]
fn test_counter_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut counter = RevolutionCounter::load(&path);
    assert_eq!(counter.get(), 0);
    counter.increment(25).unwrap();

    let reloaded = RevolutionCounter::load(&path);
    assert_eq!(reloaded.get(), 25);
}

#[test]
fn test_counter_clamps_at_zero() {
    let dir = tempdir().unwrap();
    let mut counter = RevolutionCounter::load(dir.path().join("state.json"));

    counter.increment(10).unwrap();
    assert_eq!(counter.increment(-50).unwrap(), 0);
    assert_eq!(counter.set(-5).unwrap(), 0);
}

#[test]
fn test_corrupt_state_file_starts_fresh() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let mut counter = RevolutionCounter::load(&path);
    assert_eq!(counter.get(), 0);
    counter.increment(1).unwrap();
    assert_eq!(RevolutionCounter::load(&path).get(), 1);
}

#[test]
fn test_reads_legacy_state_without_timestamp() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{"counter":96000}"#).unwrap();

    assert_eq!(RevolutionCounter::load(&path).get(), 96000);
}

#[tokio::test]
async fn test_counter_sink_accumulates_deltas() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let counter = RevolutionCounter::load(&path).shared();
    let (mut sink, writer) = CounterSink::spawn(counter.clone());

    sink.accept(&event(3));
    sink.accept(&MetricEvent::idle(0.1));
    sink.accept(&event(4));
    drop(sink);
    writer.await.unwrap();

    assert_eq!(counter.lock().unwrap().get(), 7);
    assert_eq!(RevolutionCounter::load(&path).get(), 7);
}
