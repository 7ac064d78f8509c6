//! WebSocket Streaming Server
//!
//! Accepts dashboard connections and forwards every metric event to all of
//! them. Each client gets a greeting and a state snapshot first.

use super::{StreamMessage, StreamingConfig, StreamingError};
use crate::metrics::sink::BroadcastSink;
use crate::metrics::types::MetricEvent;
use crate::storage::counter::SharedCounter;
use futures::stream::StreamExt;
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;

/// Events buffered per slow client before it starts skipping.
const CLIENT_BACKLOG: usize = 100;

/// Fan-out relay from the metrics session to WebSocket clients.
pub struct MetricRelay {
    config: StreamingConfig,
    metrics_tx: broadcast::Sender<MetricEvent>,
    counter: SharedCounter,
    latest: Arc<Mutex<Option<MetricEvent>>>,
}

impl MetricRelay {
    /// Create a relay reading the counter for state snapshots.
    pub fn new(config: StreamingConfig, counter: SharedCounter) -> Self {
        let (metrics_tx, _) = broadcast::channel(CLIENT_BACKLOG);

        Self {
            config,
            metrics_tx,
            counter,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Sink to attach to the metrics session.
    pub fn sink(&self) -> BroadcastSink {
        BroadcastSink::new(self.metrics_tx.clone())
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> Result<TcpListener, StreamingError> {
        if !self.config.enabled {
            return Err(StreamingError::Disabled);
        }

        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| StreamingError::BindFailed(e.to_string()))?;

        tracing::info!("WebSocket relay listening on ws://{}", addr);
        Ok(listener)
    }

    /// Bind and serve until the listener fails.
    pub async fn run(self: Arc<Self>) -> Result<(), StreamingError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve clients on an already bound listener.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), StreamingError> {
        tokio::spawn(Self::track_latest(
            self.metrics_tx.subscribe(),
            self.latest.clone(),
        ));

        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .map_err(|e| StreamingError::WebSocketError(e.to_string()))?;

            let relay = self.clone();
            tokio::spawn(async move {
                if let Err(e) = relay.serve_client(stream, peer).await {
                    tracing::warn!("Streaming client {} failed: {}", peer, e);
                }
            });
        }
    }

    /// Keep the most recent event for state snapshots.
    async fn track_latest(
        mut rx: broadcast::Receiver<MetricEvent>,
        latest: Arc<Mutex<Option<MetricEvent>>>,
    ) {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(mut latest) = latest.lock() {
                        *latest = Some(event);
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Current counter, distance and speed.
    pub fn snapshot(&self) -> StreamMessage {
        let counter = match self.counter.lock() {
            Ok(counter) => counter.get(),
            Err(poisoned) => poisoned.into_inner().get(),
        };
        let latest = self.latest.lock().ok().and_then(|latest| *latest);

        StreamMessage::State {
            counter,
            distance_km: latest.map_or(0.0, |e| e.cumulative_distance_km),
            speed_kmh: latest.map_or(0.0, |e| e.speed_kmh),
        }
    }

    async fn serve_client(&self, stream: TcpStream, peer: SocketAddr) -> Result<(), StreamingError> {
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| StreamingError::WebSocketError(e.to_string()))?;

        tracing::info!("Client connected via WebSocket: {}", peer);

        let (mut outgoing, mut incoming) = ws.split();
        let mut metrics_rx = self.metrics_tx.subscribe();

        for message in [StreamMessage::welcome(), self.snapshot()] {
            outgoing
                .send(Message::Text(message.to_json()?))
                .await
                .map_err(|e| StreamingError::WebSocketError(e.to_string()))?;
        }

        loop {
            tokio::select! {
                event = metrics_rx.recv() => match event {
                    Ok(event) => {
                        let json = StreamMessage::from(&event).to_json()?;
                        outgoing
                            .send(Message::Text(json))
                            .await
                            .map_err(|e| StreamingError::WebSocketError(e.to_string()))?;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client {} lagged, skipped {} events", peer, skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                message = incoming.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        tracing::info!("Received from client {}: {}", peer, text);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(StreamingError::WebSocketError(e.to_string())),
                },
            }
        }

        tracing::info!("Client disconnected: {}", peer);
        Ok(())
    }
}
