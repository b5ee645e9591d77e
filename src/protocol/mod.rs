//! # ESC/POS Protocol Implementation
//!
//! This module provides the low-level command builders used to lay out a
//! queue-token receipt for ESC/POS-compatible thermal printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Control bytes and paper feed
//! - [`text`]: Alignment and print mode (font size)
//! - [`graphics`]: Raster bit image (`GS v 0`)
//! - [`charset`]: Single-byte text encoding
//!
//! ## Usage Example
//!
//! ```
//! use tokenprint::protocol::{charset, commands, text};
//!
//! let mut data = Vec::new();
//!
//! data.extend(text::align_center());
//! data.extend(text::print_mode(text::PrintMode::DOUBLE_HEIGHT));
//! data.extend(charset::encode("RECEIPT\n"));
//! data.extend(text::print_mode(text::PrintMode::BODY));
//! data.extend(commands::feed_lines(3));
//!
//! assert_eq!(&data[..3], &[0x1B, 0x61, 0x01]);
//! ```

pub mod charset;
pub mod commands;
pub mod graphics;
pub mod text;
