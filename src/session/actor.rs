//! Single-task driver for a `CscSession`.
//!
//! Notifications, connection changes, the watchdog deadline and the idle
//! check all arrive as branches of one `select!`. Commands are polled first,
//! so a notification ready in the same tick as a timer wins.

use crate::sensors::types::SensorError;
use crate::session::{CscSession, MIN_TIMER_PERIOD};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Input to the session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Raw CSC Measurement payload
    Notification(Vec<u8>),
    /// Link started connecting
    Connecting,
    /// Link connected
    Connected,
    /// Link dropped
    Disconnected,
    /// Stop the task
    Shutdown,
}

/// Cloneable sender side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> Result<(), SensorError> {
        self.tx.send(command).map_err(|_| SensorError::SessionClosed)
    }

    /// Forward a notification payload.
    pub fn notify(&self, data: Vec<u8>) -> Result<(), SensorError> {
        self.send(SessionCommand::Notification(data))
    }

    /// Report that the link started connecting.
    pub fn connecting(&self) -> Result<(), SensorError> {
        self.send(SessionCommand::Connecting)
    }

    /// Report that the link is connected.
    pub fn connected(&self) -> Result<(), SensorError> {
        self.send(SessionCommand::Connected)
    }

    /// Report that the link dropped.
    pub fn disconnected(&self) -> Result<(), SensorError> {
        self.send(SessionCommand::Disconnected)
    }

    /// Ask the task to stop. Pending timers are cancelled.
    pub fn shutdown(&self) -> Result<(), SensorError> {
        self.send(SessionCommand::Shutdown)
    }

    /// Whether the task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the session onto the current tokio runtime.
///
/// The join handle yields the session back after shutdown.
pub fn spawn(session: CscSession) -> (SessionHandle, JoinHandle<CscSession>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(session, rx));
    (SessionHandle { tx }, task)
}

async fn run(
    mut session: CscSession,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
) -> CscSession {
    let period = session.config().idle_poll_interval.max(MIN_TIMER_PERIOD);
    let mut idle_check = time::interval(period);
    idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!("Metrics session started");

    loop {
        let deadline = session.watchdog().deadline().map(Instant::from_std);

        tokio::select! {
            biased;

            command = rx.recv() => match command {
                Some(SessionCommand::Shutdown) | None => break,
                Some(command) => apply(&mut session, command),
            },
            _ = sleep_until(deadline) => {
                session.on_deadline(now());
            }
            _ = idle_check.tick() => {
                session.on_idle_check(now());
            }
        }
    }

    session.teardown();
    tracing::info!("Metrics session stopped");
    session
}

fn apply(session: &mut CscSession, command: SessionCommand) {
    match command {
        SessionCommand::Notification(data) => {
            if let Err(e) = session.on_notification(&data, now()) {
                tracing::warn!("Dropping CSC notification: {}", e);
            }
        }
        SessionCommand::Connecting => session.on_connecting(),
        SessionCommand::Connected => session.on_connected(),
        SessionCommand::Disconnected => session.on_disconnected(),
        SessionCommand::Shutdown => {}
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
