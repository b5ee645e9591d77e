//! # Application Configuration
//!
//! Optional JSON file consumed by the CLI. Every key is optional; anything
//! left out keeps its built-in default.
//!
//! ```json
//! {
//!   "layout": { "title": "Lens Lab", "address": ["1 Main St"] },
//!   "link": { "device": "/dev/rfcomm1" },
//!   "chunk_size": 256,
//!   "qr_width": 240,
//!   "threshold": 128
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::qr::QrOptions;
use crate::raster::DEFAULT_THRESHOLD;
use crate::receipt::StoreLayout;
use crate::transport::{DEFAULT_CHUNK_SIZE, SendOptions};

/// Which printer link to use. At most one of these is normally set;
/// `device` wins over `mac`, which wins over `ble_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// RFCOMM device path, e.g. `/dev/rfcomm0`.
    pub device: Option<String>,
    /// Bluetooth MAC of a printer already bound to an RFCOMM device.
    pub mac: Option<String>,
    /// Advertised BLE name substring (needs the `ble` feature).
    pub ble_name: Option<String>,
    /// Pause after each chunk, in milliseconds (RFCOMM only).
    pub chunk_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub layout: StoreLayout,
    pub link: LinkConfig,
    pub chunk_size: usize,
    pub qr_width: usize,
    pub threshold: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout: StoreLayout::default(),
            link: LinkConfig::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            qr_width: QrOptions::DEFAULT.width_px,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            chunk_size: self.chunk_size,
        }
    }

    pub fn qr_options(&self) -> QrOptions {
        QrOptions {
            width_px: self.qr_width,
            ..QrOptions::DEFAULT
        }
    }
}
