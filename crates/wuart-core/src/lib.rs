//! # wuart-core
//!
//! Packet framing library for a wireless UART link.
//!
//! This crate is used by the `wuart-tool` command line and by anything else
//! that has to talk to the wireless UART firmware.  It has no dependencies on
//! serial port drivers or sockets; bytes go in and out through slices and the
//! [`protocol::transport::FrameSink`] trait.
//!
//! # Architecture overview (for beginners)
//!
//! A serial link moves bytes, not messages.  To send something like "set the
//! baud rate to 115200" we wrap it as a small key/value **packet**
//! (`baud=115200`), protect it with a one-byte checksum, and put a start
//! marker and a length in front of it so the receiver can find it again in
//! the byte stream.
//!
//! - **`domain`** – The [`Packet`] type: a key, an optional binary value, a
//!   validity flag and the checksum of its serialized form.
//!
//! - **`protocol`** – What happens to bytes: the backslash escape codec that
//!   keeps binary values printable, the XOR checksum, the wire frame, a
//!   streaming parser that finds frames in a noisy byte stream, and the sink
//!   trait used to send them.
//!
//! - **`diag`** – Hex and character dumps of buffers, emitted as `tracing`
//!   events.
//!
//! # Example
//!
//! ```rust
//! use wuart_core::{Frame, FrameConfig, FrameParser, Packet};
//!
//! let mut packet = Packet::with_key_value("data", &[0x00, 0x41, 0xFF]).unwrap();
//! packet.encode_value().unwrap();
//! assert_eq!(packet.value(), b"\\x00A\\xff");
//!
//! let bytes = Frame::from_packet(&packet).unwrap().encode(&FrameConfig::default()).unwrap();
//! let frames = FrameParser::default().push(&bytes);
//! let mut received = frames[0].to_packet().unwrap();
//! received.decode_value().unwrap();
//! assert_eq!(received.value(), &[0x00, 0x41, 0xFF]);
//! ```

pub mod diag;
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `wuart_core::Packet` instead of `wuart_core::domain::packet::Packet`.
pub use domain::packet::{describe, Packet, PacketError};
pub use protocol::checksum::xor_checksum;
pub use protocol::escape::{decode as unescape, encode as escape, EscapeError};
pub use protocol::frame::{Frame, FrameConfig, FrameError};
pub use protocol::parser::FrameParser;
