//! Wire frame that carries a serialized packet over the serial link.
//!
//! Wire format:
//! ```text
//! [start:2][data_len:4][payload:N][checksum:1][end:2]?
//! ```
//! `start` is `0x2423` and the optional `end` is `0x2324`.  All multi-byte
//! integers are little-endian, so the start symbol appears on the wire as
//! `0x23 0x24` and the end symbol as `0x24 0x23`.  `data_len` counts payload
//! bytes only.  `checksum` is the XOR fold of the payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::packet::{Packet, PacketError};
use crate::protocol::checksum::xor_checksum;

/// Start-of-frame marker value.
pub const START_SYMBOL: u16 = 0x2423;

/// Optional end-of-frame marker value.
pub const END_SYMBOL: u16 = 0x2324;

/// Start marker as it appears on the wire.
pub const START_BYTES: [u8; 2] = START_SYMBOL.to_le_bytes();

/// End marker as it appears on the wire.
pub const END_BYTES: [u8; 2] = END_SYMBOL.to_le_bytes();

/// Start symbol plus length field.
pub const HEADER_SIZE: usize = 2 + 4;

/// Default upper bound on the payload length accepted by decoders.
pub const DEFAULT_MAX_PAYLOAD_LEN: u32 = 64 * 1024;

/// Errors that can occur while building or reading frames.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The byte slice is shorter than the frame it starts.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The slice does not begin with the start symbol.
    #[error("bad start symbol: {0:02X?}")]
    BadStartSymbol([u8; 2]),

    /// The payload length exceeds the configured maximum.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: u32 },

    /// The transmitted checksum does not match the payload.
    #[error("checksum mismatch: frame says 0x{expected:02X}, payload folds to 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The payload does not describe a valid packet.
    #[error("invalid packet: {0}")]
    InvalidPacket(#[from] PacketError),
}

/// Frame encoding and decoding options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Whether the optional end symbol is written after the checksum.
    pub append_end_symbol: bool,
    /// Largest payload the encoder will produce and the decoder will accept.
    pub max_payload_len: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            append_end_symbol: false,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

/// A checked payload ready to be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Vec<u8>,
    checksum: u8,
}

impl Frame {
    /// Wraps `payload`, computing its checksum.
    pub fn new(payload: Vec<u8>) -> Self {
        let checksum = xor_checksum(&payload);
        Self { payload, checksum }
    }

    /// Builds a frame from the serialized form of `packet`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidPacket`] if the packet is not valid.
    pub fn from_packet(packet: &Packet) -> Result<Self, FrameError> {
        if !packet.is_valid() {
            return Err(PacketError::NotReady.into());
        }
        Ok(Self::new(packet.data_bytes()?))
    }

    /// The payload bytes (`key` or `key=value`).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// XOR checksum of the payload.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Total size of the encoded frame under `config`.
    pub fn encoded_len(&self, config: &FrameConfig) -> usize {
        let end = if config.append_end_symbol { 2 } else { 0 };
        HEADER_SIZE + self.payload.len() + 1 + end
    }

    /// Encodes the frame into a new byte vector.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLarge`] if the payload exceeds
    /// `config.max_payload_len`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wuart_core::protocol::frame::{Frame, FrameConfig};
    ///
    /// let bytes = Frame::new(b"stop".to_vec()).encode(&FrameConfig::default()).unwrap();
    /// assert_eq!(&bytes[..2], &[0x23, 0x24]);
    /// assert_eq!(&bytes[2..6], &4u32.to_le_bytes());
    /// ```
    pub fn encode(&self, config: &FrameConfig) -> Result<Vec<u8>, FrameError> {
        check_payload_len(self.payload.len(), config.max_payload_len)?;
        let mut buf = Vec::with_capacity(self.encoded_len(config));
        buf.extend_from_slice(&START_BYTES);
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.push(self.checksum);
        if config.append_end_symbol {
            buf.extend_from_slice(&END_BYTES);
        }
        Ok(buf)
    }

    /// Splits the payload back into a [`Packet`].
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidPacket`] if the payload is not a valid
    /// `key` / `key=value` serialization.
    pub fn to_packet(&self) -> Result<Packet, FrameError> {
        Ok(Packet::from_payload(&self.payload)?)
    }

    /// Consumes the frame, returning its payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Encodes `payload` as a complete frame.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] if the payload exceeds
/// `config.max_payload_len`.
pub fn encode_frame(payload: &[u8], config: &FrameConfig) -> Result<Vec<u8>, FrameError> {
    Frame::new(payload.to_vec()).encode(config)
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns the frame and the number of bytes consumed, including a trailing
/// end symbol when one is present.
///
/// # Errors
///
/// - [`FrameError::InsufficientData`] if `bytes` ends before the frame does.
/// - [`FrameError::BadStartSymbol`] if `bytes` does not start with the marker.
/// - [`FrameError::PayloadTooLarge`] if the declared length exceeds `max_payload_len`.
/// - [`FrameError::ChecksumMismatch`] if the payload is corrupt.
pub fn decode_frame(bytes: &[u8], max_payload_len: u32) -> Result<(Frame, usize), FrameError> {
    if bytes.len() < HEADER_SIZE {
        return Err(FrameError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }
    let start = [bytes[0], bytes[1]];
    if start != START_BYTES {
        return Err(FrameError::BadStartSymbol(start));
    }

    let payload_len = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;
    check_payload_len(payload_len, max_payload_len)?;

    let checksum_at = HEADER_SIZE + payload_len;
    if bytes.len() <= checksum_at {
        return Err(FrameError::InsufficientData {
            needed: checksum_at + 1,
            available: bytes.len(),
        });
    }

    let payload = &bytes[HEADER_SIZE..checksum_at];
    let expected = bytes[checksum_at];
    let actual = xor_checksum(payload);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    let mut consumed = checksum_at + 1;
    if bytes[consumed..].starts_with(&END_BYTES) {
        consumed += END_BYTES.len();
    }

    Ok((
        Frame {
            payload: payload.to_vec(),
            checksum: expected,
        },
        consumed,
    ))
}

fn check_payload_len(len: usize, max: u32) -> Result<(), FrameError> {
    if len > max as usize {
        return Err(FrameError::PayloadTooLarge { len, max });
    }
    Ok(())
}
