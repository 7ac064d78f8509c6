//! Inactivity watchdog.
//!
//! Two independent triggers decide when the rider has stopped:
//! a single-shot deadline rearmed on every accepted measurement, and a
//! periodic idle check against the last packet seen. Both lead to the same
//! force-zero action, which the owner implements once.

use crate::metrics::types::INACTIVITY_TIMEOUT;
use std::time::{Duration, Instant};

/// Single-shot deadline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchdogState {
    /// Never armed, or cancelled
    #[default]
    Idle,
    /// Waiting for the deadline
    Armed { deadline: Instant },
    /// Deadline elapsed; stays here until the next accepted measurement
    Fired,
}

/// Deadline tracker for the zero-motion fallback.
#[derive(Debug)]
pub struct InactivityWatchdog {
    /// Time allowed between accepted measurements
    timeout: Duration,
    /// Single-shot timer state
    state: WatchdogState,
    /// Last time any decodable packet arrived
    last_packet_at: Option<Instant>,
}

impl Default for InactivityWatchdog {
    fn default() -> Self {
        Self::new(INACTIVITY_TIMEOUT)
    }
}

impl InactivityWatchdog {
    /// Create a watchdog with the given timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: WatchdogState::Idle,
            last_packet_at: None,
        }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current single-shot state.
    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// Pending deadline, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchdogState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Rearm after an accepted measurement.
    pub fn arm(&mut self, now: Instant) {
        self.state = WatchdogState::Armed {
            deadline: now + self.timeout,
        };
    }

    /// Note that a packet arrived, accepted or not.
    pub fn record_packet(&mut self, now: Instant) {
        self.last_packet_at = Some(now);
    }

    /// Check the single-shot deadline.
    ///
    /// Returns `true` exactly once per arming, when `now` has reached the
    /// deadline. A rearm that landed first pushes the deadline out and
    /// this returns `false`.
    pub fn poll_deadline(&mut self, now: Instant) -> bool {
        match self.state {
            WatchdogState::Armed { deadline } if now >= deadline => {
                self.state = WatchdogState::Fired;
                true
            }
            _ => false,
        }
    }

    /// Safety-net check: no packet seen for longer than the timeout.
    pub fn is_idle(&self, now: Instant) -> bool {
        self.last_packet_at
            .is_some_and(|at| now.saturating_duration_since(at) > self.timeout)
    }

    /// Drop any pending deadline.
    pub fn cancel(&mut self) {
        self.state = WatchdogState::Idle;
    }
}
