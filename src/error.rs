//! # Error Types
//!
//! This module defines error types used throughout the tokenprint library.
//!
//! Errors fall into two groups:
//!
//! - **Programmer errors** ([`RasterError`], [`EncodingError`]): malformed
//!   input or a Rasterizer/Encoder mismatch. These are never retried.
//! - **Operational errors** ([`ConnectError`], [`WriteError`],
//!   [`TransportError`]): the printer link is flaky. The transport retries
//!   once and then reports a typed result.

use thiserror::Error;

/// Malformed pixel bitmap handed to the rasterizer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RasterError {
    /// Zero width/height, or a pixel buffer whose length is not
    /// `width * height * 4`.
    #[error("Invalid dimensions: {width}x{height} with {len} bytes of pixel data")]
    InvalidDimensions {
        width: usize,
        height: usize,
        len: usize,
    },
}

/// Internal invariant violation while building the command stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// Packed payload length disagrees with `row_stride * height`.
    #[error("Raster payload mismatch: expected {expected} bytes, got {actual}")]
    PayloadMismatch { expected: usize, actual: usize },

    /// Row stride or height does not fit the 16-bit raster header fields.
    #[error("Raster dimensions too large for header: {row_stride} bytes x {height} rows")]
    DimensionsTooLarge { row_stride: usize, height: usize },

    /// Date/time format string the timestamp cannot be rendered with.
    #[error("Invalid date/time format: {0:?}")]
    InvalidTimeFormat(String),
}

/// Image bytes that could not be turned into a pixel bitmap.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// The link provider could not open a writable endpoint.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No matching device or writable characteristic was found.
    #[error("No printer found: {0}")]
    NotFound(String),

    /// The device exists but refused or dropped the connection.
    #[error("Printer unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A chunk write did not complete.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The link went away under us.
    #[error("Link disconnected")]
    Disconnected,

    /// The device rejected the write (GATT error, timeout, ...).
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Underlying cause carried by [`TransportError::Send`].
#[derive(Debug, Error)]
pub enum LinkFailure {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result of a failed [`send`](crate::transport::send).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The first connect attempt failed; nothing was written.
    #[error("Connect failed: {0}")]
    Connect(#[source] ConnectError),

    /// The send failed, was retried once from scratch, and failed again.
    ///
    /// `cause` is the failure of the last attempt. `initial` is the failure
    /// that triggered the retry; it differs from `cause` when, say, a write
    /// dropped the link and the reconnect was then refused.
    #[error("Send failed after {attempts} attempts: {cause}")]
    Send {
        attempts: u32,
        #[source]
        cause: LinkFailure,
        initial: Option<LinkFailure>,
    },

    #[error("Chunk size must be at least 1 byte")]
    InvalidChunkSize,
}

/// Configuration file problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error for the CLI and other application code
#[derive(Debug, Error)]
pub enum TokenprintError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Image could not be written (PNG export)
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// QR symbol could not be generated (payload too long, ...)
    #[error("QR error: {0}")]
    Qr(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
