//! Hex text in and out.

use std::fmt::Write as _;

use wuart_core::protocol::escape::is_printable;

use super::ToolError;

/// Parses hex text into bytes.
///
/// Accepted forms, with any whitespace ignored:
/// - `\23\24\05…` (the wire format printed by `build`)
/// - `0x232405…`
/// - `232405…`
///
/// # Errors
///
/// Returns [`ToolError::InvalidHex`] for an odd number of digits or a
/// non-hex character.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, ToolError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body
        .bytes()
        .filter(|b| *b != b'\\' && !b.is_ascii_whitespace())
        .collect();

    if digits.len() % 2 != 0 {
        return Err(ToolError::InvalidHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }
    digits
        .chunks(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

fn nibble(digit: u8) -> Result<u8, ToolError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(ToolError::InvalidHex(format!(
            "unexpected character {:?}",
            digit as char
        ))),
    }
}

/// Formats bytes as uppercase `\XX` pairs.
pub fn to_wire_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for b in bytes {
        let _ = write!(out, "\\{b:02X}");
    }
    out
}

/// Formats bytes as `0x` followed by lowercase hex.
pub fn to_hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Shows printable values as text and anything else as a hex literal.
pub fn render_value(value: &[u8]) -> String {
    if value.iter().all(|&b| is_printable(b)) {
        value.iter().map(|&b| b as char).collect()
    } else {
        to_hex_literal(value)
    }
}

/// Interprets a command-line value: `0x…` is hex, anything else is UTF-8 text.
///
/// # Errors
///
/// Returns [`ToolError::InvalidHex`] for a malformed `0x…` value.
pub fn parse_value_arg(value: &str) -> Result<Vec<u8>, ToolError> {
    if value.starts_with("0x") {
        parse_hex(value)
    } else {
        Ok(value.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_accepts_all_three_forms() {
        let expected = vec![0x23, 0x24, 0x05];
        assert_eq!(parse_hex("\\23\\24\\05").unwrap(), expected);
        assert_eq!(parse_hex("0x232405").unwrap(), expected);
        assert_eq!(parse_hex("23 24 05\n").unwrap(), expected);
        assert_eq!(parse_hex("0XaBcD").unwrap(), vec![0xAB, 0xCD]);
    }

    #[test]
    fn test_parse_hex_rejects_odd_length() {
        assert!(matches!(parse_hex("abc"), Err(ToolError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_hex_rejects_non_hex_character() {
        assert!(matches!(parse_hex("zz"), Err(ToolError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_hex_empty_is_empty() {
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_wire_text_is_uppercase_backslash_pairs() {
        assert_eq!(to_wire_text(&[0x23, 0x24, 0x0a, 0xff]), "\\23\\24\\0A\\FF");
    }

    #[test]
    fn test_wire_text_parses_back() {
        let bytes = vec![0x00, 0x5C, 0x7F, 0x80];
        assert_eq!(parse_hex(&to_wire_text(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_render_value_prefers_text() {
        assert_eq!(render_value(b"115200"), "115200");
        assert_eq!(render_value(&[0x00, 0x41]), "0x0041");
        assert_eq!(render_value(b""), "");
    }

    #[test]
    fn test_parse_value_arg() {
        assert_eq!(parse_value_arg("0x00ff").unwrap(), vec![0x00, 0xFF]);
        assert_eq!(parse_value_arg("/dev/ttyUSB0").unwrap(), b"/dev/ttyUSB0");
        assert!(parse_value_arg("0xf").is_err());
    }
}
