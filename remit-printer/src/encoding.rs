//! Code page utilities for Latin thermal printers
//!
//! Receipt text is composed as UTF-8, but thermal printers only understand
//! single-byte code tables. This module provides utilities for:
//! - Calculating printed column widths
//! - Truncating/padding strings to a column width
//! - Converting UTF-8 text to Windows-1252 (ESC/POS code table 16)
//!
//! Text is converted as it is written, so ESC/POS parameter bytes above 0x7F
//! (barcode lengths, drawer pulse timings) are never reinterpreted as text.

use encoding_rs::WINDOWS_1252;

/// ESC/POS code table number for WPC1252 (`ESC t 16`)
pub const CODE_TABLE_WPC1252: u8 = 16;

/// Byte printed in place of characters the code page cannot represent
const REPLACEMENT: u8 = b'?';

/// Convert one character to its Windows-1252 byte
pub fn encode_char(c: char) -> u8 {
    if c.is_ascii() {
        return c as u8;
    }
    let mut utf8 = [0u8; 4];
    let (cow, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut utf8));
    match cow.as_ref() {
        [b] if !had_errors => *b,
        _ => REPLACEMENT,
    }
}

/// Convert UTF-8 text to Windows-1252 bytes
///
/// Unmappable characters become `?`; ASCII passes through untouched.
pub fn encode_text(s: &str) -> Vec<u8> {
    s.chars().map(encode_char).collect()
}

/// Printed width of a string in columns
///
/// Every Windows-1252 character occupies exactly one column.
pub(crate) fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub(crate) fn truncate_width(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub(crate) fn pad_width(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_width(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}
