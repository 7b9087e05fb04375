//! Human-readable buffer dumps for tracing.
//!
//! Buffers are split into rows of [`ROW_LEN`] bytes.  Each row starts with
//! the offset of its first byte and is rendered in one of three styles:
//!
//! ```text
//! Hex      00000000  23 24 05 00 00 00 73 74  61 72 74 60
//! Char     00000000  |#$....start`|
//! HexDump  00000000  23 24 05 00 00 00 73 74  61 72 74 60              |#$....start`|
//! ```
//!
//! Dumps are for diagnostics only; nothing in the crate makes decisions based
//! on them.

use std::fmt::Write as _;

use tracing::Level;

use crate::protocol::escape::is_printable;

/// Bytes per dump row.
pub const ROW_LEN: usize = 16;

/// Width of the hex column in [`DumpStyle::HexDump`] rows.
const HEX_COLUMN: usize = 50;

/// Rendering style for [`dump_rows`] and [`log_buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStyle {
    /// Hex pairs only.
    Hex,
    /// Printable characters only, `.` for everything else.
    Char,
    /// Hex pairs followed by the character column.
    HexDump,
}

/// Renders up to [`ROW_LEN`] bytes as hex pairs, with an extra space after
/// the eighth byte.
pub fn hex_row(chunk: &[u8]) -> String {
    let mut out = String::with_capacity(ROW_LEN * 3 + 1);
    for (i, b) in chunk.iter().enumerate() {
        if i > 0 {
            out.push_str(if i % 8 == 0 { "  " } else { " " });
        }
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Renders bytes as characters, substituting `.` for non-printables.
pub fn char_row(chunk: &[u8]) -> String {
    chunk
        .iter()
        .map(|&b| if is_printable(b) { b as char } else { '.' })
        .collect()
}

/// Splits `bytes` into rows rendered in `style`.
///
/// An empty buffer produces no rows.
pub fn dump_rows(bytes: &[u8], style: DumpStyle) -> Vec<String> {
    bytes
        .chunks(ROW_LEN)
        .enumerate()
        .map(|(row, chunk)| {
            let offset = row * ROW_LEN;
            match style {
                DumpStyle::Hex => format!("{offset:08x}  {}", hex_row(chunk)),
                DumpStyle::Char => format!("{offset:08x}  |{}|", char_row(chunk)),
                DumpStyle::HexDump => format!(
                    "{offset:08x}  {:<width$}|{}|",
                    hex_row(chunk),
                    char_row(chunk),
                    width = HEX_COLUMN
                ),
            }
        })
        .collect()
}

/// Emits one tracing event per dump row at `level`.
pub fn log_buffer(tag: &str, bytes: &[u8], style: DumpStyle, level: Level) {
    for row in dump_rows(bytes, style) {
        match level {
            Level::ERROR => tracing::error!(tag = tag, "{row}"),
            Level::WARN => tracing::warn!(tag = tag, "{row}"),
            Level::INFO => tracing::info!(tag = tag, "{row}"),
            Level::DEBUG => tracing::debug!(tag = tag, "{row}"),
            _ => tracing::trace!(tag = tag, "{row}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_hex_row_groups_by_eight() {
        let row = hex_row(&(0u8..16).collect::<Vec<_>>());
        assert_eq!(
            row,
            "00 01 02 03 04 05 06 07  08 09 0a 0b 0c 0d 0e 0f"
        );
        assert_eq!(row.len(), 48);
    }

    #[test]
    fn test_char_row_substitutes_non_printables() {
        assert_eq!(char_row(b"ok\r\n\x7f~"), "ok...~");
    }

    #[test]
    fn test_dump_rows_splits_into_sixteen_byte_rows() {
        // Arrange
        let bytes: Vec<u8> = (0u8..40).collect();

        // Act
        let rows = dump_rows(&bytes, DumpStyle::Hex);

        // Assert
        assert_eq!(rows.len(), 3);
        assert!(rows[1].starts_with("00000010  10 11"));
        assert!(rows[2].ends_with("26 27"));
    }

    #[test]
    fn test_hexdump_row_aligns_char_column() {
        let rows = dump_rows(b"#$start", DumpStyle::HexDump);
        assert_eq!(rows.len(), 1);
        let bar = rows[0].find('|').unwrap();
        assert_eq!(bar, 10 + HEX_COLUMN);
        assert!(rows[0].ends_with("|#$start|"));
    }

    #[test]
    fn test_empty_buffer_has_no_rows() {
        assert!(dump_rows(&[], DumpStyle::Char).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_log_buffer_emits_each_row() {
        log_buffer("packet", b"key2=123", DumpStyle::Char, Level::INFO);
        assert!(logs_contain("|key2=123|"));
    }
}
