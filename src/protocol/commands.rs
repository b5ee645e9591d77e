//! # ESC/POS Control Bytes
//!
//! ESC/POS is a byte-oriented printer control protocol. Printable bytes are
//! rendered as text in the current print mode; control sequences start with
//! one of the prefix bytes below.
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Prefix + opcode + parameters: `ESC a n`, `ESC ! n`
//! - Prefix + opcode + header + payload: `GS v 0 m xL xH yL yH d1...dk`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
///
/// Text formatting commands (alignment, print mode) begin with ESC (0x1B).
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for graphics commands such as `GS v 0` raster images.
/// - Hex: 0x1D, Decimal: 29
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print and advance one line
///
/// Prints any data in the line buffer and advances paper by the current
/// line spacing.
pub const LF: u8 = 0x0A;

// ============================================================================
// PAPER FEED
// ============================================================================

/// # Feed Lines (LF × n)
///
/// Emits `n` bare line feeds. At the end of a receipt this advances the last
/// printed row past the tear bar / cutter.
///
/// Plain `LF` bytes are used rather than `ESC d n` so the output works on
/// printers that only implement the core command set.
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::commands;
///
/// assert_eq!(commands::feed_lines(3), vec![0x0A, 0x0A, 0x0A]);
/// ```
#[inline]
pub fn feed_lines(n: usize) -> Vec<u8> {
    vec![LF; n]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(200), [0xC8, 0x00]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

/// Decode little-endian bytes [low, high] back into a u16
#[inline]
pub const fn u16_from_le(bytes: [u8; 2]) -> u16 {
    bytes[0] as u16 | (bytes[1] as u16) << 8
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_lines() {
        assert_eq!(feed_lines(0), Vec::<u8>::new());
        assert_eq!(feed_lines(3), vec![LF, LF, LF]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0x00FF), [0xFF, 0x00]);
        assert_eq!(u16_le(0xFF00), [0x00, 0xFF]);
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
    }

    #[test]
    fn test_u16_le_round_trip_edges() {
        for value in [0u16, 1, 255, 256, 0x7FFF, u16::MAX] {
            assert_eq!(u16_from_le(u16_le(value)), value);
        }
    }
}
