//! Sensor manager for the BLE CSC link.
//!
//! Scans for a Cycling Speed and Cadence sensor, connects, subscribes to CSC
//! Measurement notifications and forwards them to a metrics session. Only
//! one connection is ever in flight; after a disconnect the manager scans
//! again when auto-reconnect is enabled.

use crate::sensors::csc::{CSC_MEASUREMENT_UUID, CSC_SERVICE_UUID};
use crate::sensors::types::{ConnectionPhase, SensorConfig, SensorError};
use crate::session::SessionHandle;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use std::time::Duration;

/// Compare peripheral ids, ignoring case and hyphens.
///
/// CoreBluetooth ids show up both hyphenated and bare depending on the tool
/// that printed them.
pub fn device_id_matches(candidate: &str, target: &str) -> bool {
    let normalize = |id: &str| -> String {
        id.chars()
            .filter(|c| *c != '-' && *c != ':')
            .map(|c| c.to_ascii_lowercase())
            .collect()
    };
    normalize(candidate) == normalize(target)
}

/// Manages discovery, connection and notification streaming for one sensor.
pub struct SensorManager {
    /// Configuration
    config: SensorConfig,
    /// BLE adapter
    adapter: Option<Adapter>,
    /// Session receiving notifications and phase changes
    session: SessionHandle,
    /// Current link phase
    phase: ConnectionPhase,
}

impl SensorManager {
    /// Create a new sensor manager feeding `session`.
    pub fn new(config: SensorConfig, session: SessionHandle) -> Self {
        Self {
            config,
            adapter: None,
            session,
            phase: ConnectionPhase::Disconnected,
        }
    }

    /// Initialize the BLE adapter.
    ///
    /// This must be called before `run`.
    pub async fn initialize(&mut self) -> Result<(), SensorError> {
        tracing::info!("Initializing SensorManager");

        let manager = Manager::new()
            .await
            .map_err(|e| SensorError::BleError(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| SensorError::BleError(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(SensorError::AdapterNotFound)?;

        tracing::info!("BLE adapter initialized");
        self.adapter = Some(adapter);

        Ok(())
    }

    /// Move to `next` and tell the session.
    fn set_phase(&mut self, next: ConnectionPhase) -> Result<(), SensorError> {
        self.phase.transition(next)?;

        match next {
            ConnectionPhase::Connecting => self.session.connecting(),
            ConnectionPhase::Connected => self.session.connected(),
            ConnectionPhase::Disconnected => self.session.disconnected(),
        }
    }

    /// Discover, connect and stream until the link is lost for good.
    ///
    /// Returns when auto-reconnect is off and the sensor disconnects, or
    /// with `SessionClosed` once the metrics session stops.
    pub async fn run(&mut self) -> Result<(), SensorError> {
        loop {
            match self.connect_and_stream().await {
                Ok(()) => tracing::info!("Sensor disconnected"),
                Err(SensorError::SessionClosed) => return Err(SensorError::SessionClosed),
                Err(e) => tracing::error!("Sensor link failed: {}", e),
            }

            if self.phase != ConnectionPhase::Disconnected {
                self.set_phase(ConnectionPhase::Disconnected)?;
            }

            if !self.config.auto_reconnect {
                return Ok(());
            }

            tokio::time::sleep(Duration::from_secs(self.config.reconnect_delay_secs)).await;
        }
    }

    /// One connection attempt, streaming until the sensor goes away.
    async fn connect_and_stream(&mut self) -> Result<(), SensorError> {
        let adapter = self.adapter.clone().ok_or(SensorError::AdapterNotFound)?;

        let peripheral = self.discover(&adapter).await?;
        let device_id = peripheral.id().to_string();

        self.set_phase(ConnectionPhase::Connecting)?;
        tracing::info!("Connecting to sensor: {}", device_id);

        let result = self.stream(&adapter, &peripheral).await;

        if peripheral.is_connected().await.unwrap_or(false) {
            if let Err(e) = peripheral.disconnect().await {
                tracing::debug!("Disconnect after link end failed: {}", e);
            }
        }

        result
    }

    /// Scan until a matching sensor is seen.
    async fn discover(&self, adapter: &Adapter) -> Result<Peripheral, SensorError> {
        let filter = match &self.config.target_device_id {
            // Some sensors omit the service from their advertisement
            Some(_) => ScanFilter::default(),
            None => ScanFilter {
                services: vec![CSC_SERVICE_UUID],
            },
        };

        let mut events = adapter
            .events()
            .await
            .map_err(|e| SensorError::BleError(e.to_string()))?;

        adapter
            .start_scan(filter)
            .await
            .map_err(|e| SensorError::ScanFailed(e.to_string()))?;

        tracing::info!("Scanning for CSC sensor");

        let timeout_secs = self.config.discovery_timeout_secs;
        let found = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => continue,
                };

                let Ok(peripheral) = adapter.peripheral(&id).await else {
                    continue;
                };

                if self.is_target(&peripheral).await {
                    return Some(peripheral);
                }
            }
            None
        })
        .await;

        if let Err(e) = adapter.stop_scan().await {
            tracing::debug!("Failed to stop scan: {}", e);
        }

        match found {
            Ok(Some(peripheral)) => {
                tracing::info!("Found CSC sensor: {}", peripheral.id());
                Ok(peripheral)
            }
            Ok(None) => Err(SensorError::ScanFailed(
                "adapter event stream ended".to_string(),
            )),
            Err(_) => Err(SensorError::ScanTimeout(timeout_secs)),
        }
    }

    /// Whether a discovered peripheral is the sensor we want.
    async fn is_target(&self, peripheral: &Peripheral) -> bool {
        if let Some(target) = &self.config.target_device_id {
            return device_id_matches(&peripheral.id().to_string(), target);
        }

        match peripheral.properties().await {
            Ok(Some(properties)) => properties.services.contains(&CSC_SERVICE_UUID),
            _ => false,
        }
    }

    /// Connect, subscribe and pump notifications into the session.
    async fn stream(&mut self, adapter: &Adapter, peripheral: &Peripheral) -> Result<(), SensorError> {
        let connect_timeout = Duration::from_secs(self.config.connection_timeout_secs);
        tokio::time::timeout(connect_timeout, peripheral.connect())
            .await
            .map_err(|_| SensorError::ConnectionTimeout)?
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == CSC_MEASUREMENT_UUID)
            .ok_or(SensorError::CharacteristicNotFound)?;

        let mut adapter_events = adapter
            .events()
            .await
            .map_err(|e| SensorError::BleError(e.to_string()))?;

        let mut notifications = peripheral
            .notifications()
            .await
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;

        peripheral
            .subscribe(&characteristic)
            .await
            .map_err(|e| SensorError::SubscriptionFailed(e.to_string()))?;

        self.set_phase(ConnectionPhase::Connected)?;
        tracing::info!("Subscribed to CSC measurement on {}", peripheral.id());

        let peripheral_id = peripheral.id();
        loop {
            tokio::select! {
                notification = notifications.next() => match notification {
                    Some(notification) if notification.uuid == CSC_MEASUREMENT_UUID => {
                        self.session.notify(notification.value)?;
                    }
                    Some(_) => {}
                    // Stream ended - peripheral disconnected
                    None => break,
                },
                event = adapter_events.next() => match event {
                    Some(CentralEvent::DeviceDisconnected(id)) if id == peripheral_id => break,
                    Some(_) => {}
                    None => break,
                },
            }
        }

        Ok(())
    }
}
