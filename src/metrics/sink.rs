//! Metric sinks.
//!
//! A sink accepts every `MetricEvent` the session emits. Delivery is
//! fire-and-forget with no retries.

use crate::metrics::types::MetricEvent;
use crate::storage::counter::SharedCounter;
use crossbeam::channel::Sender;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Receiver of emitted metric events.
pub trait MetricSink: Send {
    /// Take one event.
    fn accept(&mut self, event: &MetricEvent);
}

impl<F> MetricSink for F
where
    F: FnMut(&MetricEvent) + Send,
{
    fn accept(&mut self, event: &MetricEvent) {
        self(event)
    }
}

/// Forwards events over a crossbeam channel.
pub struct ChannelSink {
    tx: Sender<MetricEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn unbounded() -> (Self, crossbeam::channel::Receiver<MetricEvent>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        (Self { tx }, rx)
    }
}

impl MetricSink for ChannelSink {
    fn accept(&mut self, event: &MetricEvent) {
        // Receiver gone means nobody is listening; drop the event
        let _ = self.tx.send(*event);
    }
}

/// Publishes events to any number of broadcast subscribers.
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<MetricEvent>,
}

impl BroadcastSink {
    /// Wrap an existing broadcast sender.
    pub fn new(tx: broadcast::Sender<MetricEvent>) -> Self {
        Self { tx }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }
}

impl MetricSink for BroadcastSink {
    fn accept(&mut self, event: &MetricEvent) {
        // Err only when there are no subscribers
        let _ = self.tx.send(*event);
    }
}

/// Feeds revolution deltas into the persistent counter.
///
/// `accept` only queues the delta. A writer task owns the disk writes, so the
/// session loop never waits on the filesystem.
pub struct CounterSink {
    tx: mpsc::UnboundedSender<u32>,
}

impl CounterSink {
    /// Start the writer task for `counter` on the current tokio runtime.
    ///
    /// The task exits after every queued delta is written and the sink is
    /// dropped; await the handle to flush on shutdown.
    pub fn spawn(counter: SharedCounter) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_deltas(counter, rx));
        (Self { tx }, writer)
    }
}

impl MetricSink for CounterSink {
    fn accept(&mut self, event: &MetricEvent) {
        if event.delta_revolutions == 0 {
            return;
        }

        if self.tx.send(event.delta_revolutions).is_err() {
            tracing::warn!(
                "Counter writer stopped, dropping {} revs",
                event.delta_revolutions
            );
        }
    }
}

async fn write_deltas(counter: SharedCounter, mut rx: mpsc::UnboundedReceiver<u32>) {
    while let Some(mut delta) = rx.recv().await {
        // Fold a backlog into one write
        while let Ok(more) = rx.try_recv() {
            delta = delta.saturating_add(more);
        }

        let counter = counter.clone();
        let written = tokio::task::spawn_blocking(move || {
            let mut counter = match counter.lock() {
                Ok(counter) => counter,
                Err(poisoned) => poisoned.into_inner(),
            };
            counter.increment(i64::from(delta))
        })
        .await;

        match written {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Failed to persist revolution counter: {}", e),
            Err(e) => tracing::error!("Counter write task failed: {}", e),
        }
    }
}
