//! # ESC/POS Raster Graphics
//!
//! This module implements the `GS v 0` raster bit image command.
//!
//! ## Bit Packing
//!
//! Graphics data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0x0F = 00001111 = ░░░░████
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```
//!
//! See [`crate::raster`] for how RGBA pixels become this layout.

use super::commands::{GS, u16_from_le, u16_le};
use crate::error::EncodingError;
use crate::raster::{PackedBitmap, row_stride};

/// Length of the `GS v 0 m xL xH yL yH` header.
pub const RASTER_HEADER_LEN: usize = 8;

/// Mode byte `m`: normal density (1:1 dots).
pub const MODE_NORMAL: u8 = 0x00;

/// Fixed opcode bytes `GS v 0`.
const OPCODE: [u8; 3] = [GS, b'v', b'0'];

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
/// | Decimal | 29 118 48 m xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: Mode (0 = normal)
/// - `xL, xH`: Row stride in **bytes**, little-endian
/// - `yL, yH`: Height in dots, little-endian
/// - `d1...dk`: Image data, k = stride × height bytes
///
/// ## Data Layout
///
/// Row by row, each byte is 8 horizontal dots:
///
/// ```text
/// Row 0:    d[0]      d[1]       ... d[stride-1]
/// Row 1:    d[stride] d[stride+1] ... d[2*stride-1]
/// ...
/// ```
///
/// ## Errors
///
/// - [`EncodingError::PayloadMismatch`] if the bitmap's bytes are not exactly
///   `ceil(width/8) × height` long
/// - [`EncodingError::DimensionsTooLarge`] if stride or height exceeds 65535,
///   or their product does not fit in `usize`
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::graphics;
/// use tokenprint::raster::PackedBitmap;
///
/// let image = PackedBitmap::from_raw(16, 2, vec![0xFF; 4]);
/// let cmd = graphics::raster(&image)?;
///
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 2, 0]);
/// assert_eq!(cmd.len(), 8 + 4);
/// # Ok::<(), tokenprint::error::EncodingError>(())
/// ```
pub fn raster(image: &PackedBitmap) -> Result<Vec<u8>, EncodingError> {
    let stride = row_stride(image.width());
    let Some(expected) = stride.checked_mul(image.height()) else {
        return Err(EncodingError::DimensionsTooLarge {
            row_stride: stride,
            height: image.height(),
        });
    };
    let actual = image.data().len();
    if actual != expected {
        return Err(EncodingError::PayloadMismatch { expected, actual });
    }

    let header = RasterHeader::new(stride, image.height())?;

    let mut cmd = Vec::with_capacity(RASTER_HEADER_LEN + actual);
    cmd.extend_from_slice(&header.to_bytes());
    cmd.extend_from_slice(image.data());
    Ok(cmd)
}

/// Decoded `GS v 0` header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterHeader {
    pub mode: u8,
    pub row_stride: u16,
    pub height: u16,
}

impl RasterHeader {
    /// Header for a normal-mode image, checking both fields fit 16 bits.
    pub fn new(row_stride: usize, height: usize) -> Result<Self, EncodingError> {
        match (u16::try_from(row_stride), u16::try_from(height)) {
            (Ok(row_stride), Ok(height)) => Ok(Self {
                mode: MODE_NORMAL,
                row_stride,
                height,
            }),
            _ => Err(EncodingError::DimensionsTooLarge { row_stride, height }),
        }
    }

    pub fn to_bytes(&self) -> [u8; RASTER_HEADER_LEN] {
        let [xl, xh] = u16_le(self.row_stride);
        let [yl, yh] = u16_le(self.height);
        [OPCODE[0], OPCODE[1], OPCODE[2], self.mode, xl, xh, yl, yh]
    }

    /// Parse a header from the start of `bytes`.
    ///
    /// Returns `None` if `bytes` is too short or does not start with `GS v 0`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..RASTER_HEADER_LEN)?;
        if header[..3] != OPCODE {
            return None;
        }
        Some(Self {
            mode: header[3],
            row_stride: u16_from_le([header[4], header[5]]),
            height: u16_from_le([header[6], header[7]]),
        })
    }

    /// Payload length announced by this header.
    pub fn payload_len(&self) -> usize {
        self.row_stride as usize * self.height as usize
    }
}

// ============================================================================
// TESTS
// ============================================================================
