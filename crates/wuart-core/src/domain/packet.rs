//! The in-memory key/value packet carried over the wireless UART link.
//!
//! # Lifecycle
//!
//! ```text
//! Packet::new()  ──init / set_key_value──▶  ready  ──release──▶  zeroed
//!      ▲                                      │
//!      └──────────── allocation failure ◀─────┘   (ready = false)
//! ```
//!
//! A packet serializes to `key` when it has no value and to `key=value`
//! otherwise.  That serialization is both the checksum input and the payload
//! of a wire [`Frame`](crate::protocol::frame::Frame).
//!
//! # Validity
//!
//! A packet is valid when it is ready and has a non-empty key.  The checksum
//! is tracked on its own: an XOR fold of real data can be `0x00`, so a zero
//! checksum is not treated as "unset".

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::domain::buffer::{self, BufferError};
use crate::protocol::checksum::xor_checksum;
use crate::protocol::escape;

/// Separator between key and value in the serialized form.
pub const KEY_VALUE_SEPARATOR: u8 = b'=';

/// Longest key prefix shown by the [`Display`](fmt::Display) rendering.
pub const DISPLAY_KEY_LIMIT: usize = 32;

/// Errors produced by packet operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The key is missing or empty.
    #[error("packet key must not be empty")]
    EmptyKey,

    /// The key contains the `=` separator, which would make the serialized
    /// form ambiguous.
    #[error("packet key must not contain '=' (found at byte {position})")]
    ReservedSeparator { position: usize },

    /// A received key is not valid UTF-8.
    #[error("packet key is not valid UTF-8")]
    InvalidKeyEncoding,

    /// The operation needs a valid packet.
    #[error("packet is not ready")]
    NotReady,

    /// The destination buffer cannot hold the serialized packet.
    #[error("insufficient capacity: need {needed} bytes, {available} available")]
    InsufficientCapacity { needed: usize, available: usize },

    /// A key or value buffer could not be replaced.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// A key/value unit with readiness and checksum state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    ready: bool,
    key: String,
    value: Vec<u8>,
    checksum: u8,
}

impl Packet {
    /// Creates an unready, zeroed packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor: a new packet initialised with `key` and `value`.
    ///
    /// # Errors
    ///
    /// See [`Packet::set_key_value`].
    pub fn with_key_value(key: &str, value: &[u8]) -> Result<Self, PacketError> {
        let mut packet = Self::new();
        packet.init(key, value)?;
        Ok(packet)
    }

    /// Releases any current contents, then assigns `key` and `value`.
    ///
    /// # Errors
    ///
    /// See [`Packet::set_key_value`].  On error the packet is left released
    /// and not ready.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wuart_core::Packet;
    ///
    /// let mut packet = Packet::new();
    /// packet.init("key2", b"123").unwrap();
    /// assert_eq!(packet.to_string(), "Packet(ready=1,key=key2,val=3)");
    /// ```
    pub fn init(&mut self, key: &str, value: &[u8]) -> Result<(), PacketError> {
        self.release();
        self.set_key_value(key, value)
    }

    /// Replaces the key and value and recomputes the checksum.
    ///
    /// An empty or absent value leaves the packet with no value.
    ///
    /// # Errors
    ///
    /// - [`PacketError::EmptyKey`] if `key` is empty.
    /// - [`PacketError::ReservedSeparator`] if `key` contains `=`.
    /// - [`PacketError::Buffer`] if a buffer could not be allocated.
    ///
    /// A rejected key leaves the packet exactly as it was.  If an allocation
    /// fails after validation, each buffer holds either its old or its new
    /// contents in full and the packet is marked not ready.
    pub fn set_key_value(&mut self, key: &str, value: &[u8]) -> Result<(), PacketError> {
        validate_key(key)?;
        let result = buffer::replace_text(&mut self.key, key)
            .and_then(|()| buffer::replace_bytes(&mut self.value, Some(value)))
            .map_err(PacketError::from)
            .and_then(|()| self.calc_checksum());
        self.ready = result.is_ok();
        result.map(|_| ())
    }

    /// Returns `true` if the packet is ready and has a non-empty key.
    pub fn is_valid(&self) -> bool {
        self.ready && !self.key.is_empty()
    }

    /// Clears key and value and zeroes all state.
    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// The key, empty when the packet was never assigned.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value bytes, empty when the packet carries no value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The checksum computed at the last successful assignment.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Length of the serialized form (`key` or `key=value`).
    pub fn data_len(&self) -> usize {
        if self.value.is_empty() {
            self.key.len()
        } else {
            self.key.len() + 1 + self.value.len()
        }
    }

    /// Serializes the packet into `dest`, returning the number of bytes
    /// written.
    ///
    /// # Errors
    ///
    /// - [`PacketError::EmptyKey`] if the packet has no key.
    /// - [`PacketError::InsufficientCapacity`] if `dest` is too small; nothing
    ///   is written in that case.
    pub fn get_data_bytes(&self, dest: &mut [u8]) -> Result<usize, PacketError> {
        if self.key.is_empty() {
            return Err(PacketError::EmptyKey);
        }
        let needed = self.data_len();
        if dest.len() < needed {
            return Err(PacketError::InsufficientCapacity {
                needed,
                available: dest.len(),
            });
        }
        let key = self.key.as_bytes();
        dest[..key.len()].copy_from_slice(key);
        if !self.value.is_empty() {
            dest[key.len()] = KEY_VALUE_SEPARATOR;
            dest[key.len() + 1..needed].copy_from_slice(&self.value);
        }
        Ok(needed)
    }

    /// Serializes the packet into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::EmptyKey`] if the packet has no key.
    pub fn data_bytes(&self) -> Result<Vec<u8>, PacketError> {
        let mut buf = vec![0u8; self.data_len()];
        let len = self.get_data_bytes(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Recomputes, stores and returns the checksum of the serialized packet.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::EmptyKey`] if the packet has no key; the stored
    /// checksum is reset to `0` in that case.
    pub fn calc_checksum(&mut self) -> Result<u8, PacketError> {
        self.checksum = 0;
        let data = self.data_bytes()?;
        self.checksum = xor_checksum(&data);
        Ok(self.checksum)
    }

    /// Replaces the value with its escaped form.
    ///
    /// A packet without a value is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NotReady`] for an invalid packet, or a buffer
    /// error if the new value cannot be stored.
    pub fn encode_value(&mut self) -> Result<(), PacketError> {
        if !self.is_valid() {
            return Err(PacketError::NotReady);
        }
        if self.value.is_empty() {
            return Ok(());
        }
        let encoded = escape::encode(&self.value);
        debug!(raw = self.value.len(), encoded = encoded.len(), "value escaped");
        self.replace_value(&encoded)
    }

    /// Replaces an escaped value with its decoded bytes.
    ///
    /// Malformed escape sequences are passed through literally.
    ///
    /// # Errors
    ///
    /// Returns [`PacketError::NotReady`] for an invalid packet, or a buffer
    /// error if the new value cannot be stored.
    pub fn decode_value(&mut self) -> Result<(), PacketError> {
        if !self.is_valid() {
            return Err(PacketError::NotReady);
        }
        if self.value.is_empty() {
            return Ok(());
        }
        let decoded = escape::decode(&self.value);
        debug!(escaped = self.value.len(), decoded = decoded.len(), "value unescaped");
        self.replace_value(&decoded)
    }

    fn replace_value(&mut self, value: &[u8]) -> Result<(), PacketError> {
        buffer::replace_bytes(&mut self.value, Some(value))?;
        self.calc_checksum()?;
        Ok(())
    }

    /// Rebuilds a packet from a received payload.
    ///
    /// The payload is split at the first `=` if it appears after at least one
    /// key byte; otherwise the whole payload is the key and the value is empty.
    ///
    /// # Errors
    ///
    /// - [`PacketError::EmptyKey`] for an empty payload.
    /// - [`PacketError::InvalidKeyEncoding`] if the key is not UTF-8.
    /// - [`PacketError::ReservedSeparator`] if the payload starts with `=`.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PacketError> {
        let (key, value) = match payload.iter().position(|&b| b == KEY_VALUE_SEPARATOR) {
            Some(idx) if idx > 0 => (&payload[..idx], &payload[idx + 1..]),
            _ => (payload, &[][..]),
        };
        let key = std::str::from_utf8(key).map_err(|_| PacketError::InvalidKeyEncoding)?;
        Self::with_key_value(key, value)
    }
}

fn validate_key(key: &str) -> Result<(), PacketError> {
    if key.is_empty() {
        return Err(PacketError::EmptyKey);
    }
    if let Some(position) = key.bytes().position(|b| b == KEY_VALUE_SEPARATOR) {
        return Err(PacketError::ReservedSeparator { position });
    }
    Ok(())
}

impl fmt::Display for Packet {
    /// Renders `Packet(ready=<0|1>[,key=<key>,val=<len>])`.
    ///
    /// The key is cut to [`DISPLAY_KEY_LIMIT`] bytes; the value is shown only
    /// by its length.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet(ready={}", u8::from(self.ready))?;
        if self.is_valid() {
            let mut key_buf = [0u8; DISPLAY_KEY_LIMIT + 1];
            let n = buffer::copy_text_truncated(&mut key_buf, &self.key);
            write!(
                f,
                ",key={},val={}",
                String::from_utf8_lossy(&key_buf[..n]),
                self.value.len()
            )?;
        }
        f.write_str(")")
    }
}

/// Renders an optional packet reference, using `Packet(None)` when absent.
pub fn describe(packet: Option<&Packet>) -> String {
    match packet {
        Some(p) => p.to_string(),
        None => "Packet(None)".to_string(),
    }
}
