//! # ESC/POS Text Formatting Commands
//!
//! ## Text Alignment
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```
//!
//! ## Print Mode
//!
//! `ESC ! n` sets font, emphasis and size in one byte:
//!
//! | Bit | Meaning |
//! |-----|---------|
//! | 0 | Font B (smaller cell) |
//! | 3 | Emphasized |
//! | 4 | Double height |
//! | 5 | Double width |
//! | 7 | Underline |

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// Takes effect at the start of the next line and stays until changed.
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// Convenience function for center alignment
#[inline]
pub fn align_center() -> Vec<u8> {
    align(Alignment::Center)
}

// ============================================================================
// PRINT MODE
// ============================================================================

/// Raw `ESC !` parameter byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintMode(pub u8);

impl PrintMode {
    /// Double-height glyphs, used for the store title.
    pub const DOUBLE_HEIGHT: Self = Self(0x10);

    /// Body text mode.
    ///
    /// Bits 0-1 are set; most 58mm firmwares treat this as the default
    /// font, and it is what receipts have always been printed with.
    pub const BODY: Self = Self(0x03);

    pub const NORMAL: Self = Self(0x00);
    pub const EMPHASIZED: Self = Self(0x08);
    pub const DOUBLE_WIDTH: Self = Self(0x20);
}

/// # Select Print Mode (ESC ! n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC ! n |
/// | Hex     | 1B 21 n |
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::text::{print_mode, PrintMode};
///
/// assert_eq!(print_mode(PrintMode::DOUBLE_HEIGHT), vec![0x1B, 0x21, 0x10]);
/// ```
pub fn print_mode(mode: PrintMode) -> Vec<u8> {
    vec![ESC, b'!', mode.0]
}

// ============================================================================
// LAYOUT HELPERS
// ============================================================================

/// Pad `s` with spaces so it sits centered in a `width`-column line.
///
/// Extra odd space goes to the right. Text wider than the line is returned
/// unchanged; the printer wraps it.
pub fn center_in(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(right))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align_center(), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_print_mode() {
        assert_eq!(print_mode(PrintMode::DOUBLE_HEIGHT), vec![0x1B, 0x21, 0x10]);
        assert_eq!(print_mode(PrintMode::BODY), vec![0x1B, 0x21, 0x03]);
        assert_eq!(print_mode(PrintMode::NORMAL), vec![0x1B, 0x21, 0x00]);
    }

    #[test]
    fn test_center_in() {
        assert_eq!(center_in("ab", 6), "  ab  ");
        assert_eq!(center_in("abc", 6), " abc  ");
        assert_eq!(center_in("toolong", 4), "toolong");
        assert_eq!(center_in("Optician's Store", 32).len(), 32);
    }
}
