//! # QR Bitmap Source
//!
//! Renders a QR symbol for the token payload (the customer id) into a
//! [`PixelBitmap`], ready for [`crate::raster::rasterize`].
//!
//! The symbol is scaled to a target pixel width including the quiet zone.
//! Module edges fall on fractional pixel positions when the target is not
//! a multiple of the module count; each output pixel samples the module
//! under it.

use qrcode::{Color, EcLevel, QrCode};

use crate::error::TokenprintError;
use crate::raster::PixelBitmap;

const DARK: [u8; 4] = [0, 0, 0, 255];
const LIGHT: [u8; 4] = [255, 255, 255, 255];

/// QR rendering parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    /// Output width (and height) in pixels, quiet zone included.
    pub width_px: usize,
    /// Quiet zone on each side, in modules.
    pub margin_modules: usize,
    pub ec_level: EcLevel,
}

impl QrOptions {
    /// 200 px square with a 4-module quiet zone, medium error correction.
    pub const DEFAULT: Self = Self {
        width_px: 200,
        margin_modules: 4,
        ec_level: EcLevel::M,
    };
}

impl Default for QrOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Render `data` as a square black-on-white QR bitmap.
///
/// If `width_px` is smaller than the symbol plus quiet zone, one pixel per
/// module is used instead so the symbol stays scannable.
///
/// ## Example
///
/// ```
/// use tokenprint::qr::{render_qr, QrOptions};
///
/// let bitmap = render_qr("12345", &QrOptions::DEFAULT)?;
/// assert_eq!((bitmap.width, bitmap.height), (200, 200));
/// # Ok::<(), tokenprint::error::TokenprintError>(())
/// ```
pub fn render_qr(data: &str, options: &QrOptions) -> Result<PixelBitmap, TokenprintError> {
    let code = QrCode::with_error_correction_level(data, options.ec_level)
        .map_err(|e| TokenprintError::Qr(format!("QR code generation failed: {}", e)))?;

    let modules = code.width();
    let total_modules = modules + 2 * options.margin_modules;
    let size = options.width_px.max(total_modules);
    let colors = code.to_colors();

    let mut pixels = Vec::with_capacity(size * size * 4);
    for py in 0..size {
        let my = py * total_modules / size;
        for px in 0..size {
            let mx = px * total_modules / size;
            let dark = module_at(&colors, modules, options.margin_modules, mx, my);
            pixels.extend_from_slice(if dark { &DARK } else { &LIGHT });
        }
    }

    Ok(PixelBitmap {
        width: size,
        height: size,
        data: pixels,
    })
}

/// Whether the module at (mx, my), in quiet-zone coordinates, is dark.
fn module_at(colors: &[Color], modules: usize, margin: usize, mx: usize, my: usize) -> bool {
    if mx < margin || my < margin {
        return false;
    }
    let (qx, qy) = (mx - margin, my - margin);
    if qx >= modules || qy >= modules {
        return false;
    }
    colors[qy * modules + qx] == Color::Dark
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{DEFAULT_THRESHOLD, rasterize};

    #[test]
    fn test_default_size() {
        let bitmap = render_qr("12345", &QrOptions::DEFAULT).unwrap();
        assert_eq!(bitmap.width, 200);
        assert_eq!(bitmap.height, 200);
        assert_eq!(bitmap.data.len(), 200 * 200 * 4);
    }

    #[test]
    fn test_quiet_zone_is_blank() {
        let bitmap = render_qr("12345", &QrOptions::DEFAULT).unwrap();
        let packed = rasterize(&bitmap, DEFAULT_THRESHOLD).unwrap();
        // 21 modules + 8 quiet = 29 modules over 200 px, so the first 27 px are margin
        for x in 0..200 {
            assert!(!packed.is_dark(x, 0));
            assert!(!packed.is_dark(x, 20));
        }
        // top-left finder pattern starts right after the quiet zone
        let first = (4 * 200usize).div_ceil(29);
        assert!(packed.is_dark(first, first));
    }

    #[test]
    fn test_tiny_target_falls_back_to_one_px_per_module() {
        let options = QrOptions {
            width_px: 10,
            ..QrOptions::DEFAULT
        };
        let bitmap = render_qr("12345", &options).unwrap();
        assert_eq!(bitmap.width, 21 + 8);
    }

    #[test]
    fn test_payload_too_long() {
        let data = "9".repeat(10_000);
        assert!(matches!(
            render_qr(&data, &QrOptions::DEFAULT),
            Err(TokenprintError::Qr(_))
        ));
    }
}
