//! BLE sensor link
//!
//! The fixture streams samples as notifications on the Nordic UART service:
//! - `6e400001-b5a3-f393-e0a9-e50e24dcca9e` - Nordic UART Service (NUS)
//! - `6e400002-b5a3-f393-e0a9-e50e24dcca9e` - Sample data (notify)
//!
//! Both UUIDs can be overridden in the `[device]` config section.

use std::time::{Duration, Instant};

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use super::{SampleEvent, SourceError, SourceEvent};
use crate::config::DeviceConfig;

/// Channel capacity for sensor events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// BLE scan result
#[derive(Clone, Debug)]
pub struct DiscoveredSensor {
    /// Device address (MAC address string)
    pub address: String,
    /// Device name (from advertisement)
    pub name: Option<String>,
    /// Signal strength (RSSI in dBm)
    pub rssi: i16,
    /// Whether the sample service is advertised
    pub has_sample_service: bool,
}

impl DiscoveredSensor {
    /// Name if advertised, address otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// Link to a single Trackahedron over BLE.
pub struct BleSensorLink {
    adapter: Adapter,
    config: DeviceConfig,
    epoch: Instant,
}

impl BleSensorLink {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns error if Bluetooth is not available
    pub async fn new(config: DeviceConfig) -> Result<Self, anyhow::Error> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No Bluetooth adapter found"))?;

        Ok(Self {
            adapter,
            config,
            epoch: Instant::now(),
        })
    }

    /// Scan for sensors matching the name filter or advertising the sample
    /// service.
    pub async fn scan(&self) -> Result<Vec<DiscoveredSensor>, anyhow::Error> {
        tracing::info!(secs = self.config.scan_secs, "Starting BLE scan");

        // Unfiltered so that sensors matched by name alone are also seen
        self.adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(Duration::from_secs(self.config.scan_secs)).await;
        self.adapter.stop_scan().await?;

        let mut sensors = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let Some(properties) = peripheral.properties().await? else {
                continue;
            };

            let sensor = DiscoveredSensor {
                address: peripheral.address().to_string(),
                name: properties.local_name.clone(),
                rssi: properties.rssi.unwrap_or(0),
                has_sample_service: properties.services.contains(&self.config.service_uuid),
            };

            if self.matches_filter(&sensor) {
                sensors.push(sensor);
            }
        }

        tracing::info!("Scan complete: found {} sensors", sensors.len());
        Ok(sensors)
    }

    /// Name filter when configured, advertised service otherwise.
    fn matches_filter(&self, sensor: &DiscoveredSensor) -> bool {
        match (&self.config.name_filter, &sensor.name) {
            (None, _) => sensor.has_sample_service,
            (Some(filter), Some(name)) => name.contains(filter.as_str()),
            (Some(_), None) => false,
        }
    }

    /// Connect to a sensor and stream its samples.
    ///
    /// The returned channel yields `Connected`, then samples, then a final
    /// `Disconnected` when the notification stream ends.
    pub async fn connect(
        &self,
        sensor: &DiscoveredSensor,
    ) -> Result<mpsc::Receiver<SourceEvent>, anyhow::Error> {
        tracing::info!(address = %sensor.address, "Connecting to sensor");

        let peripheral = self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address().to_string() == sensor.address)
            .ok_or_else(|| SourceError::NotFound(sensor.address.clone()))?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.config.characteristic_uuid)
            .ok_or_else(|| {
                anyhow::anyhow!("Sample characteristic {} not found", self.config.characteristic_uuid)
            })?;

        peripheral.subscribe(&characteristic).await?;
        tracing::debug!("Subscribed to sample notifications");

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let _ = tx
            .send(SourceEvent::Connected {
                name: sensor.display_name().to_string(),
            })
            .await;

        self.spawn_notification_handler(peripheral, tx);
        Ok(rx)
    }

    /// Scan and connect to the first matching sensor.
    pub async fn connect_first(&self) -> Result<mpsc::Receiver<SourceEvent>, anyhow::Error> {
        let sensors = self.scan().await?;
        let sensor = sensors.first().ok_or_else(|| {
            SourceError::NotFound(
                self.config
                    .name_filter
                    .clone()
                    .unwrap_or_else(|| "no sensor advertising the sample service".to_string()),
            )
        })?;
        self.connect(sensor).await
    }

    /// Forward notifications for the sample characteristic.
    fn spawn_notification_handler(&self, peripheral: Peripheral, tx: mpsc::Sender<SourceEvent>) {
        let characteristic_uuid = self.config.characteristic_uuid;
        let epoch = self.epoch;

        tokio::spawn(async move {
            let mut stream = match peripheral.notifications().await {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx
                        .send(SourceEvent::Disconnected {
                            reason: Some(format!("Failed to get notification stream: {e}")),
                        })
                        .await;
                    return;
                }
            };

            while let Some(notification) = stream.next().await {
                if notification.uuid != characteristic_uuid {
                    continue;
                }

                let timestamp_ms = u64::try_from(epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
                let event = SourceEvent::Sample(SampleEvent::new(timestamp_ms, notification.value));
                if tx.send(event).await.is_err() {
                    tracing::debug!("Sample receiver dropped");
                    let _ = peripheral.disconnect().await;
                    return;
                }
            }

            // Stream ended, device disconnected
            tracing::warn!("Sensor notification stream ended");
            let _ = tx
                .send(SourceEvent::Disconnected {
                    reason: Some("notification stream ended".to_string()),
                })
                .await;
        });
    }
}
