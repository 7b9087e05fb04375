//! Byte-level protocol: escaping, checksums, framing and the transport seam.

pub mod checksum;
pub mod escape;
pub mod frame;
pub mod parser;
pub mod transport;

pub use checksum::xor_checksum;
pub use escape::{decode, decode_into, decode_strict, encode, encode_into, EscapeError};
pub use frame::{decode_frame, encode_frame, Frame, FrameConfig, FrameError};
pub use parser::{FrameParser, ParserStats};
pub use transport::{send_packet, FrameSink, IoSink, MemorySink, TransportError};
