//! Unit tests for the inactivity watchdog.

use bikestream::metrics::watchdog::{InactivityWatchdog, WatchdogState};
use std::time::{Duration, Instant};

#[test]
fn test_fires_once_per_arming() {
    let mut watchdog = InactivityWatchdog::default();
    let start = Instant::now();
    watchdog.arm(start);

    assert!(!watchdog.poll_deadline(start + Duration::from_millis(1999)));
    assert!(watchdog.poll_deadline(start + Duration::from_secs(2)));
    assert!(!watchdog.poll_deadline(start + Duration::from_secs(3)));
    assert_eq!(watchdog.state(), WatchdogState::Fired);
}

#[test]
fn test_rearm_pushes_deadline() {
    let mut watchdog = InactivityWatchdog::default();
    let start = Instant::now();
    watchdog.arm(start);
    watchdog.arm(start + Duration::from_millis(1500));

    assert!(!watchdog.poll_deadline(start + Duration::from_secs(2)));
    assert_eq!(
        watchdog.deadline(),
        Some(start + Duration::from_millis(3500))
    );
}

#[test]
fn test_idle_uses_last_packet() {
    let mut watchdog = InactivityWatchdog::new(Duration::from_secs(2));
    let start = Instant::now();

    assert!(!watchdog.is_idle(start + Duration::from_secs(10)));

    watchdog.record_packet(start);
    assert!(!watchdog.is_idle(start + Duration::from_secs(2)));
    assert!(watchdog.is_idle(start + Duration::from_millis(2001)));
}

#[test]
fn test_cancel_clears_deadline() {
    let mut watchdog = InactivityWatchdog::default();
    let start = Instant::now();
    watchdog.arm(start);
    watchdog.cancel();

    assert_eq!(watchdog.deadline(), None);
    assert!(!watchdog.poll_deadline(start + Duration::from_secs(5)));
}
