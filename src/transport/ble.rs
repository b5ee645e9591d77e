//! # Bluetooth LE Link
//!
//! Writes print data to a GATT characteristic, using `btleplug` for
//! discovery and I/O. Enabled with the `ble` feature.
//!
//! ## Characteristic Selection
//!
//! After connecting, services are discovered and the first *primary*
//! service that has a characteristic with the `WRITE` property is used.
//! Within that service the first writable characteristic (by UUID order)
//! receives the data. Most BLE receipt printers expose exactly one.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    CharPropFlags, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Manager, Peripheral};
use tracing::{debug, info, instrument};

use super::LinkProvider;
use crate::error::{ConnectError, WriteError};

/// How long to scan for advertising printers before giving up.
pub const DEFAULT_SCAN_TIME: Duration = Duration::from_secs(5);

/// BLE printer link.
#[derive(Debug, Clone)]
pub struct BleLink {
    /// Substring of the advertised local name; `None` takes the first
    /// device that exposes a writable characteristic.
    name_filter: Option<String>,
    scan_time: Duration,
}

/// Connected peripheral plus the characteristic print data goes to.
#[derive(Debug)]
pub struct BleHandle {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

impl BleLink {
    pub fn new(name_filter: Option<String>) -> Self {
        Self {
            name_filter,
            scan_time: DEFAULT_SCAN_TIME,
        }
    }

    pub fn with_scan_time(mut self, scan_time: Duration) -> Self {
        self.scan_time = scan_time;
        self
    }

    async fn scan(&self) -> Result<Vec<Peripheral>, ConnectError> {
        let manager = Manager::new().await.map_err(unavailable)?;
        let central = manager
            .adapters()
            .await
            .map_err(unavailable)?
            .into_iter()
            .next()
            .ok_or_else(|| ConnectError::NotFound("No Bluetooth adapter".into()))?;

        central
            .start_scan(ScanFilter::default())
            .await
            .map_err(unavailable)?;
        tokio::time::sleep(self.scan_time).await;
        let peripherals = central.peripherals().await.map_err(unavailable)?;
        central.stop_scan().await.map_err(unavailable)?;

        let mut matches = Vec::new();
        for peripheral in peripherals {
            let name = peripheral
                .properties()
                .await
                .map_err(unavailable)?
                .and_then(|p| p.local_name);
            debug!(?name, "found peripheral");
            let wanted = match (&self.name_filter, &name) {
                (None, _) => true,
                (Some(filter), Some(name)) => name.contains(filter.as_str()),
                (Some(_), None) => false,
            };
            if wanted {
                matches.push(peripheral);
            }
        }
        Ok(matches)
    }
}

fn unavailable(e: btleplug::Error) -> ConnectError {
    ConnectError::Unavailable(e.to_string())
}

/// First writable characteristic on the first primary service that has one.
fn writable_characteristic(peripheral: &Peripheral) -> Option<Characteristic> {
    peripheral
        .services()
        .into_iter()
        .filter(|service| service.primary)
        .find_map(|service| {
            service
                .characteristics
                .into_iter()
                .find(|c| c.properties.contains(CharPropFlags::WRITE))
        })
}

#[async_trait]
impl LinkProvider for BleLink {
    type Handle = BleHandle;

    #[instrument(skip(self), fields(name_filter = ?self.name_filter))]
    async fn connect(&self) -> Result<BleHandle, ConnectError> {
        for peripheral in self.scan().await? {
            if !peripheral.is_connected().await.map_err(unavailable)? {
                if let Err(e) = peripheral.connect().await {
                    debug!(error = %e, "peripheral refused connection");
                    continue;
                }
            }
            peripheral.discover_services().await.map_err(unavailable)?;

            if let Some(characteristic) = writable_characteristic(&peripheral) {
                info!(characteristic = %characteristic.uuid, "ble printer connected");
                return Ok(BleHandle {
                    peripheral,
                    characteristic,
                });
            }
            // not a printer; leave it alone
            let _ = peripheral.disconnect().await;
        }

        Err(ConnectError::NotFound(
            "No BLE device with a writable characteristic".into(),
        ))
    }

    async fn write_chunk(&self, handle: &mut BleHandle, bytes: &[u8]) -> Result<(), WriteError> {
        handle
            .peripheral
            .write(&handle.characteristic, bytes, WriteType::WithResponse)
            .await
            .map_err(|e| match e {
                btleplug::Error::NotConnected => WriteError::Disconnected,
                other => WriteError::Rejected(other.to_string()),
            })
    }

    async fn close(&self, handle: BleHandle) {
        if let Err(e) = handle.peripheral.disconnect().await {
            debug!(error = %e, "ble disconnect failed");
        }
    }
}
