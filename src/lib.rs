//! # Tokenprint - Queue-Token Receipts for Thermal Printers
//!
//! Tokenprint prints queue-token receipts (store header, timestamp, and a
//! QR code of the customer id) on ESC/POS thermal printers over Bluetooth.
//! It provides:
//!
//! - **Rasterizer**: RGBA bitmap → 1-bit packed raster
//! - **Command encoder**: text blocks, `GS v 0` raster image, paper feed
//! - **Transport**: chunked writes with one reconnect-and-retry
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokenprint::{
//!     qr::{render_qr, QrOptions},
//!     raster::{rasterize, DEFAULT_THRESHOLD},
//!     receipt::{encode_receipt, ReceiptFields},
//!     transport::{send, PrinterConnection, RfcommLink},
//! };
//!
//! # async fn demo() -> Result<(), tokenprint::TokenprintError> {
//! // Timestamp is captured here, once
//! let fields = ReceiptFields::capture("12345", "Eye Examination");
//!
//! let bitmap = render_qr(fields.qr_payload(), &QrOptions::DEFAULT)?;
//! let image = rasterize(&bitmap, DEFAULT_THRESHOLD)?;
//! let stream = encode_receipt(&fields, &image)?;
//!
//! let link = RfcommLink::device("/dev/rfcomm0");
//! let mut conn = PrinterConnection::new();
//! send(&mut conn, &link, stream.as_bytes()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders |
//! | [`raster`] | Thresholding and bit packing |
//! | [`qr`] | QR code bitmap source |
//! | [`receipt`] | Receipt layout and command stream |
//! | [`transport`] | Connection state, chunking, retry, link providers |
//! | [`config`] | JSON configuration |
//! | [`error`] | Error types |

pub mod config;
pub mod error;
pub mod protocol;
pub mod qr;
pub mod raster;
pub mod receipt;
pub mod transport;

// Re-exports for convenience
pub use error::TokenprintError;
pub use receipt::{CommandStream, ReceiptFields, StoreLayout};
pub use transport::{PrinterConnection, RfcommLink};
