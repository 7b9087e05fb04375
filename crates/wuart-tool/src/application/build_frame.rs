//! Use case: build the wire bytes for one key/value packet.

use tracing::{debug, info};

use wuart_core::{Frame, FrameConfig, Packet};

use super::{hex, ToolError};

/// Options for [`build_packet`] beyond the key and value.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Escape the value before framing.
    pub escape_value: bool,
    /// Frame layout options.
    pub frame: FrameConfig,
}

/// Builds a valid packet from command-line text.
///
/// `value` follows [`hex::parse_value_arg`]; an empty string means no value.
///
/// # Errors
///
/// - [`ToolError::InvalidHex`] for a malformed `0x…` value.
/// - [`ToolError::Packet`] for an empty key or a key containing `=`.
pub fn build_packet(key: &str, value: &str, escape_value: bool) -> Result<Packet, ToolError> {
    let raw = hex::parse_value_arg(value)?;
    let mut packet = Packet::with_key_value(key, &raw)?;
    if escape_value {
        packet.encode_value()?;
    }
    debug!(%packet, checksum = packet.checksum(), "packet built");
    Ok(packet)
}

/// Builds the complete frame for `key` / `value`.
///
/// # Errors
///
/// Everything [`build_packet`] returns, plus [`ToolError::Frame`] when the
/// payload exceeds the configured maximum.
///
/// # Examples
///
/// ```rust
/// use wuart_tool::application::build_frame::{build_frame, BuildOptions};
///
/// let bytes = build_frame("start", "", &BuildOptions::default()).unwrap();
/// assert_eq!(bytes, [0x23, 0x24, 0x05, 0x00, 0x00, 0x00, b's', b't', b'a', b'r', b't', 0x60]);
/// ```
pub fn build_frame(key: &str, value: &str, options: &BuildOptions) -> Result<Vec<u8>, ToolError> {
    let packet = build_packet(key, value, options.escape_value)?;
    let bytes = Frame::from_packet(&packet)?.encode(&options.frame)?;
    info!(key, len = bytes.len(), "frame built");
    Ok(bytes)
}
