//! Use case: run the escape codec on one command-line value.

use wuart_core::protocol::escape;

use super::{hex, ToolError};

/// Escapes `input`, which follows [`hex::parse_value_arg`].
///
/// # Errors
///
/// Returns [`ToolError::InvalidHex`] for a malformed `0x…` input.
pub fn escape_text(input: &str) -> Result<String, ToolError> {
    let raw = hex::parse_value_arg(input)?;
    // Escaped output is printable ASCII by construction.
    Ok(escape::encode(&raw).into_iter().map(char::from).collect())
}

/// Unescapes `input` and renders the result with [`hex::render_value`].
///
/// Malformed sequences are kept literally, as the receiver does.
pub fn unescape_text(input: &str) -> String {
    hex::render_value(&escape::decode(input.as_bytes()))
}
