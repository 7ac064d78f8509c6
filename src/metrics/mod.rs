//! Metrics module: cadence, speed and distance from crank revolutions.

pub mod engine;
pub mod reconciler;
pub mod sink;
pub mod types;
pub mod watchdog;

pub use engine::{CadenceEngine, CrankBaseline, EngineState, IngestOutcome};
pub use reconciler::{ReconnectKind, ReconnectReconciler};
pub use sink::{BroadcastSink, ChannelSink, CounterSink, MetricSink};
pub use types::{EngineConfig, MetricEvent};
pub use watchdog::{InactivityWatchdog, WatchdogState};
