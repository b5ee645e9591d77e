//! # Raster Thresholding
//!
//! Converts an RGBA bitmap (as produced by the QR renderer or any decoded
//! image) into the 1-bit packed layout used by the printer's raster command.
//!
//! ## Luma and Threshold
//!
//! Each pixel's brightness is the unweighted mean of its red, green and blue
//! channels; alpha is ignored. A pixel prints when that mean is strictly
//! below the threshold:
//!
//! ```text
//! (r + g + b) / 3 < threshold   →  bit = 1 (dark, print)
//! (r + g + b) / 3 ≥ threshold   →  bit = 0 (blank)
//! ```
//!
//! The comparison is done as `r + g + b < 3 * threshold` so it stays exact in
//! integer arithmetic.
//!
//! ## Bit Packing
//!
//! - Row stride = `ceil(width / 8)` bytes, rows byte-aligned
//! - Bit 7 (MSB) = leftmost pixel of each byte
//! - Padding bits past `width` in the last byte of a row are always 0
//!
//! ```text
//! width = 10, one row:
//!   pixels  ██░░██░░██
//!   bytes   [1100 1100] [1000 0000]
//!                          ^^ ^^^^^^ padding
//! ```

use image::{GrayImage, Luma, RgbaImage};

use crate::error::{DecodeError, RasterError};

/// Default luma threshold. A mean of exactly 128 is NOT dark.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Bytes per pixel in [`PixelBitmap::data`] (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Row-major RGBA pixels, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBitmap {
    pub width: usize,
    pub height: usize,
    /// `width * height * 4` bytes, interleaved R, G, B, A.
    pub data: Vec<u8>,
}

impl PixelBitmap {
    /// Build a bitmap, checking that the buffer matches the dimensions.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterError> {
        let bitmap = Self {
            width,
            height,
            data,
        };
        bitmap.validate()?;
        Ok(bitmap)
    }

    /// A bitmap of one solid color.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: rgba.repeat(width * height),
        }
    }

    fn validate(&self) -> Result<(), RasterError> {
        let expected = self
            .width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(CHANNELS));
        if self.width == 0 || self.height == 0 || expected != Some(self.data.len()) {
            return Err(RasterError::InvalidDimensions {
                width: self.width,
                height: self.height,
                len: self.data.len(),
            });
        }
        Ok(())
    }
}

impl From<RgbaImage> for PixelBitmap {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width: width as usize,
            height: height as usize,
            data: image.into_raw(),
        }
    }
}

/// Decode an encoded image (PNG, JPEG, ...) into a [`PixelBitmap`].
pub fn decode_bitmap(bytes: &[u8]) -> Result<PixelBitmap, DecodeError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let bitmap = PixelBitmap::from(rgba);
    bitmap.validate()?;
    Ok(bitmap)
}

/// 1-bit-per-pixel image, MSB first, rows padded to whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PackedBitmap {
    /// Wrap already-packed bytes without checking their length.
    ///
    /// The command encoder re-checks `data.len() == row_stride * height`
    /// before emitting a raster command.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row: `ceil(width / 8)`.
    pub fn row_stride(&self) -> usize {
        row_stride(self.width)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the pixel at (x, y) prints. Out-of-range coordinates are blank.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data
            .get(y * self.row_stride() + x / 8)
            .is_some_and(|byte| (byte >> (7 - (x % 8))) & 1 == 1)
    }

    /// Render as a black-on-white grayscale image, for previews.
    pub fn to_gray_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let color = if self.is_dark(x, y) { 0u8 } else { 255u8 };
                img.put_pixel(x as u32, y as u32, Luma([color]));
            }
        }
        img
    }
}

/// Bytes needed for one packed row of `width` pixels.
#[inline]
pub fn row_stride(width: usize) -> usize {
    width.div_ceil(8)
}

/// Threshold an RGBA bitmap into a [`PackedBitmap`].
///
/// ## Errors
///
/// [`RasterError::InvalidDimensions`] if width or height is 0, or the pixel
/// buffer is not exactly `width * height * 4` bytes.
///
/// ## Example
///
/// ```
/// use tokenprint::raster::{rasterize, PixelBitmap, DEFAULT_THRESHOLD};
///
/// let black = PixelBitmap::filled(16, 16, [0, 0, 0, 255]);
/// let packed = rasterize(&black, DEFAULT_THRESHOLD)?;
///
/// assert_eq!(packed.row_stride(), 2);
/// assert_eq!(packed.data(), &[0xFF; 32][..]);
/// # Ok::<(), tokenprint::error::RasterError>(())
/// ```
pub fn rasterize(bitmap: &PixelBitmap, threshold: u8) -> Result<PackedBitmap, RasterError> {
    bitmap.validate()?;

    let stride = row_stride(bitmap.width);
    let cutoff = 3 * threshold as u16;
    let mut data = vec![0u8; stride * bitmap.height];

    for (y, row) in bitmap
        .data
        .chunks_exact(bitmap.width * CHANNELS)
        .enumerate()
    {
        let out = &mut data[y * stride..(y + 1) * stride];
        for (x, px) in row.chunks_exact(CHANNELS).enumerate() {
            let sum = px[0] as u16 + px[1] as u16 + px[2] as u16;
            if sum < cutoff {
                out[x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    Ok(PackedBitmap {
        width: bitmap.width,
        height: bitmap.height,
        data,
    })
}

// ============================================================================
// TESTS
// ============================================================================
