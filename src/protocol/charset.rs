//! # Single-Byte Text Encoding
//!
//! Receipt text is sent one byte per character. Printable ASCII
//! (U+0020–U+007E) and line feeds pass through unchanged; anything else is
//! replaced with `?` and a warning is logged.
//!
//! Control characters other than `\n` are replaced as well: a stray ESC or
//! GS inside a customer field would otherwise be read by the printer as the
//! start of a command.

use tracing::warn;

/// Replacement byte for characters outside the printable range.
pub const REPLACEMENT: u8 = b'?';

/// Encode a string as single-byte printer text.
///
/// ## Example
///
/// ```
/// use tokenprint::protocol::charset;
///
/// assert_eq!(charset::encode("Hi\n"), b"Hi\n".to_vec());
/// assert_eq!(charset::encode("café"), b"caf?".to_vec());
/// ```
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' | ' '..='~' => out.push(ch as u8),
            _ => {
                warn!(
                    character = %ch.escape_default(),
                    code_point = ch as u32,
                    "unmapped character, replacing with '?'"
                );
                out.push(REPLACEMENT);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let s = "Optician's Store ==== 1234 -- Date: 2024-01-02";
        assert_eq!(encode(s), s.as_bytes());
    }

    #[test]
    fn test_one_byte_per_char() {
        let s = "naïve ☕ ok";
        assert_eq!(encode(s).len(), s.chars().count());
        assert_eq!(encode(s), b"na?ve ? ok".to_vec());
    }

    #[test]
    fn test_control_bytes_are_neutralized() {
        assert_eq!(encode("a\x1Bb\x1Dc\td\n"), b"a?b?c?d\n".to_vec());
    }
}
