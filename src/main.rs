//! BikeStream - Live cadence and speed from a BLE crank sensor
//!
//! Main entry point for the application.

use anyhow::Context;
use bikestream::metrics::sink::CounterSink;
use bikestream::sensors::types::SensorConfig;
use bikestream::session::{self, CscSession, SessionConfig};
use bikestream::storage::config::{self, AppConfig};
use bikestream::storage::counter::{get_state_path, RevolutionCounter};
use bikestream::{MetricRelay, SensorManager};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BikeStream v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let config_path = config::get_config_path();
    if !config_path.exists() {
        match config::save_config(&config) {
            Ok(()) => tracing::info!("Wrote default config to {}", config_path.display()),
            Err(e) => tracing::warn!("Failed to write default config: {}", e),
        }
    }

    let counter = RevolutionCounter::load(get_state_path()).shared();
    let relay = Arc::new(MetricRelay::new(config.streaming.clone(), counter.clone()));

    let mut csc_session = CscSession::new(SessionConfig::from(&config.metrics));
    let (counter_sink, counter_writer) = CounterSink::spawn(counter);
    csc_session.add_sink(counter_sink);
    csc_session.add_sink(relay.sink());

    let (handle, session_task) = session::spawn(csc_session);

    if config.streaming.enabled {
        let relay = relay.clone();
        tokio::spawn(async move {
            if let Err(e) = relay.run().await {
                tracing::error!("WebSocket relay stopped: {}", e);
            }
        });
    }

    let mut manager = SensorManager::new(SensorConfig::from(&config.sensors), handle.clone());
    manager
        .initialize()
        .await
        .context("failed to initialize Bluetooth")?;

    tokio::select! {
        result = manager.run() => {
            if let Err(e) = result {
                tracing::error!("Sensor manager stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    // The task may already be gone if the manager stopped on a closed session
    let _ = handle.shutdown();
    let session = session_task.await.context("metrics session task panicked")?;

    // Teardown dropped the counter sink; wait for queued writes
    counter_writer.await.context("counter writer task panicked")?;

    tracing::info!(
        "Session distance: {:.3} km",
        session.engine().cumulative_distance_km()
    );

    Ok(())
}
