//! # Token Receipt Encoder
//!
//! Lays out a queue-token receipt and encodes it, together with the QR
//! image, into one ESC/POS command stream.
//!
//! ## Stream Layout
//!
//! ```text
//! ESC a 1                         center alignment
//! ================================
//! ESC ! 0x10                      double height
//!         Optician's Store
//! ESC ! 0x03                      body mode
//!       1234 Eye Care Avenue
//!       Vision City, VC 12345
//! ================================
//! Date: 2024-03-05 Time: 09:30:00
//! --------------------------------
//!    Thank you for choosing us!
//! ================================
//! GS v 0 0 xL xH yL yH <bitmap>   QR raster
//! LF LF LF                        feed past the cutter
//! ```
//!
//! The timestamp is captured once, when [`ReceiptFields`] is built; encoding
//! the same fields twice yields identical bytes.

use std::fmt::Write;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EncodingError, TokenprintError};
use crate::protocol::commands::{LF, feed_lines};
use crate::protocol::text::{PrintMode, align_center, center_in, print_mode};
use crate::protocol::{charset, graphics};
use crate::qr::{QrOptions, render_qr};
use crate::raster::{PackedBitmap, rasterize};

/// Line feeds emitted after the image.
pub const TRAILING_FEEDS: usize = 3;

// ============================================================================
// RECEIPT DATA
// ============================================================================

/// Per-token data printed on (or encoded into) one receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFields {
    pub customer_id: String,
    pub service: String,
    /// Wall-clock time captured when the token was issued.
    pub timestamp: NaiveDateTime,
}

impl ReceiptFields {
    pub fn new(
        customer_id: impl Into<String>,
        service: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            service: service.into(),
            timestamp,
        }
    }

    /// Build fields stamped with the current local time.
    pub fn capture(customer_id: impl Into<String>, service: impl Into<String>) -> Self {
        Self::new(customer_id, service, Local::now().naive_local())
    }

    /// Text encoded into the receipt's QR code.
    pub fn qr_payload(&self) -> &str {
        &self.customer_id
    }
}

/// Store branding and text layout.
///
/// Every field has a default, so a config file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    pub title: String,
    pub address: Vec<String>,
    pub thank_you: String,
    /// Characters per line in body mode (32 on 58mm paper).
    pub columns: usize,
    /// `chrono` format strings for the date/time line.
    pub date_format: String,
    pub time_format: String,
}

impl StoreLayout {
    /// The optician's store the receipts were first printed for.
    pub fn opticians() -> Self {
        Self {
            title: "Optician's Store".into(),
            address: vec![
                "1234 Eye Care Avenue".into(),
                "Vision City, VC 12345".into(),
            ],
            thank_you: "Thank you for choosing us!".into(),
            columns: 32,
            date_format: "%Y-%m-%d".into(),
            time_format: "%H:%M:%S".into(),
        }
    }

    fn divider(&self, ch: char) -> String {
        ch.to_string().repeat(self.columns)
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::opticians()
    }
}

// ============================================================================
// COMMAND STREAM
// ============================================================================

/// Finished printer byte stream, handed as-is to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStream(Vec<u8>);

impl CommandStream {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CommandStream {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encode a receipt with the default [`StoreLayout`].
pub fn encode_receipt(
    fields: &ReceiptFields,
    image: &PackedBitmap,
) -> Result<CommandStream, EncodingError> {
    encode_receipt_with_layout(fields, image, &StoreLayout::default())
}

/// Encode a receipt: text blocks, then the raster image, then paper feed.
///
/// ## Errors
///
/// [`EncodingError`] if `image` is internally inconsistent (payload length
/// not `row_stride * height`) or too large for the raster header.
pub fn encode_receipt_with_layout(
    fields: &ReceiptFields,
    image: &PackedBitmap,
    layout: &StoreLayout,
) -> Result<CommandStream, EncodingError> {
    // Build the image first so an inconsistent bitmap fails before any work
    let raster = graphics::raster(image)?;

    let mut out = Vec::with_capacity(512 + raster.len());

    out.extend(align_center());
    out.extend(charset::encode(&layout.divider('=')));
    out.push(LF);

    out.extend(print_mode(PrintMode::DOUBLE_HEIGHT));
    out.extend(charset::encode(&center_in(&layout.title, layout.columns)));
    out.push(LF);

    out.extend(print_mode(PrintMode::BODY));
    out.extend(charset::encode(&body_lines(fields, layout)?.join("\n")));
    out.push(LF);

    let closing = [
        center_in(&layout.thank_you, layout.columns),
        layout.divider('='),
    ];
    out.extend(charset::encode(&closing.join("\n")));
    out.push(LF);

    out.extend(raster);
    out.extend(feed_lines(TRAILING_FEEDS));

    Ok(CommandStream(out))
}

fn body_lines(fields: &ReceiptFields, layout: &StoreLayout) -> Result<Vec<String>, EncodingError> {
    let mut lines: Vec<String> = layout
        .address
        .iter()
        .map(|line| center_in(line, layout.columns))
        .collect();
    lines.push(layout.divider('='));
    lines.push(format!(
        "Date: {} Time: {}",
        format_timestamp(&fields.timestamp, &layout.date_format)?,
        format_timestamp(&fields.timestamp, &layout.time_format)?
    ));
    lines.push(layout.divider('-'));
    Ok(lines)
}

/// Format without panicking on a bad (config-supplied) format string.
fn format_timestamp(timestamp: &NaiveDateTime, format: &str) -> Result<String, EncodingError> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format))
        .map_err(|_| EncodingError::InvalidTimeFormat(format.to_string()))?;
    Ok(out)
}

/// Full pipeline: QR for the customer id → threshold → encode.
pub fn token_receipt(
    fields: &ReceiptFields,
    layout: &StoreLayout,
    qr: &QrOptions,
    threshold: u8,
) -> Result<CommandStream, TokenprintError> {
    let bitmap = render_qr(fields.qr_payload(), qr)?;
    let packed = rasterize(&bitmap, threshold)?;
    Ok(encode_receipt_with_layout(fields, &packed, layout)?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::graphics::{RASTER_HEADER_LEN, RasterHeader};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn fixed_fields() -> ReceiptFields {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        ReceiptFields::new("12345", "Eye Examination", timestamp)
    }

    fn image() -> PackedBitmap {
        PackedBitmap::from_raw(16, 2, vec![0xAA; 4])
    }

    fn text_part(stream: &CommandStream) -> &[u8] {
        let bytes = stream.as_bytes();
        let pos = bytes
            .windows(3)
            .position(|w| w == [0x1D, 0x76, 0x30])
            .unwrap();
        &bytes[..pos]
    }

    #[test]
    fn test_stream_starts_with_center() {
        let stream = encode_receipt(&fixed_fields(), &image()).unwrap();
        assert_eq!(&stream.as_bytes()[..3], &[0x1B, 0x61, 0x01]);
    }

    #[test]
    fn test_text_block_bytes() {
        let stream = encode_receipt(&fixed_fields(), &image()).unwrap();

        let mut expected = vec![0x1B, 0x61, 0x01];
        expected.extend(b"================================\n");
        expected.extend([0x1B, 0x21, 0x10]);
        expected.extend(b"        Optician's Store        \n");
        expected.extend([0x1B, 0x21, 0x03]);
        expected.extend(b"      1234 Eye Care Avenue      \n");
        expected.extend(b"     Vision City, VC 12345      \n");
        expected.extend(b"================================\n");
        expected.extend(b"Date: 2024-03-05 Time: 09:30:00\n");
        expected.extend(b"--------------------------------\n");
        expected.extend(b"   Thank you for choosing us!   \n");
        expected.extend(b"================================\n");

        assert_eq!(
            String::from_utf8_lossy(text_part(&stream)),
            String::from_utf8_lossy(&expected)
        );
        assert_eq!(text_part(&stream), &expected[..]);
    }

    #[test]
    fn test_image_and_feed_tail() {
        let stream = encode_receipt(&fixed_fields(), &image()).unwrap();
        let bytes = stream.as_bytes();
        let start = text_part(&stream).len();

        let header = RasterHeader::parse(&bytes[start..]).unwrap();
        assert_eq!(header.mode, 0);
        assert_eq!(header.row_stride, 2);
        assert_eq!(header.height, 2);

        let payload = &bytes[start + RASTER_HEADER_LEN..start + RASTER_HEADER_LEN + 4];
        assert_eq!(payload, &[0xAA; 4]);
        assert_eq!(&bytes[bytes.len() - 3..], b"\n\n\n");
        assert_eq!(bytes.len(), start + RASTER_HEADER_LEN + 4 + TRAILING_FEEDS);
    }

    #[test]
    fn test_deterministic_for_fixed_clock() {
        let a = encode_receipt(&fixed_fields(), &image()).unwrap();
        let b = encode_receipt(&fixed_fields(), &image()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mismatched_image_is_rejected() {
        let broken = PackedBitmap::from_raw(16, 2, vec![0xFF; 5]);
        assert_eq!(
            encode_receipt(&fixed_fields(), &broken),
            Err(EncodingError::PayloadMismatch {
                expected: 4,
                actual: 5
            })
        );

        let huge = PackedBitmap::from_raw(usize::MAX, 9, vec![0; 4]);
        assert!(matches!(
            encode_receipt(&fixed_fields(), &huge),
            Err(EncodingError::DimensionsTooLarge { height: 9, .. })
        ));
    }

    #[test]
    fn test_custom_layout() {
        let layout = StoreLayout {
            title: "Lens Lab".into(),
            address: vec!["1 Main St".into()],
            columns: 16,
            ..StoreLayout::default()
        };
        let stream = encode_receipt_with_layout(&fixed_fields(), &image(), &layout).unwrap();
        let text = String::from_utf8_lossy(text_part(&stream)).into_owned();
        assert!(text.contains("================\n"));
        assert!(text.contains("    Lens Lab    \n"));
        assert!(text.contains("   1 Main St    \n"));
    }

    #[test]
    fn test_bad_time_format_is_an_error() {
        let layout = StoreLayout {
            time_format: "%H:%M %z".into(),
            ..StoreLayout::default()
        };
        assert_eq!(
            encode_receipt_with_layout(&fixed_fields(), &image(), &layout),
            Err(EncodingError::InvalidTimeFormat("%H:%M %z".into()))
        );
    }

    #[test]
    fn test_layout_partial_json() {
        let layout: StoreLayout = serde_json::from_str(r#"{"title": "Lens Lab"}"#).unwrap();
        assert_eq!(layout.title, "Lens Lab");
        assert_eq!(layout.columns, 32);
        assert_eq!(layout.address, StoreLayout::opticians().address);
    }

    #[test]
    fn test_token_receipt_pipeline() {
        let stream =
            token_receipt(&fixed_fields(), &StoreLayout::default(), &QrOptions::DEFAULT, 128)
                .unwrap();
        let bytes = stream.as_bytes();
        let start = text_part(&stream).len();
        let header = RasterHeader::parse(&bytes[start..]).unwrap();
        assert_eq!(header.row_stride, 25);
        assert_eq!(header.height, 200);
        assert_eq!(bytes.len(), start + RASTER_HEADER_LEN + 25 * 200 + TRAILING_FEEDS);
    }
}
