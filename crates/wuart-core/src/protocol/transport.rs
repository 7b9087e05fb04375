//! Outbound seam between framed packets and whatever carries the bytes.
//!
//! The library never opens a serial port itself.  Callers hand it a
//! [`FrameSink`]: [`IoSink`] adapts any [`std::io::Write`] (a serial device
//! file, a TCP stream, stdout), and [`MemorySink`] records frames in memory
//! for tests.
//!
//! # `should_fail` flag
//!
//! Set `MemorySink::should_fail = true` to make every send return an I/O
//! error, so error paths in callers can be exercised without real hardware.

use std::io::{self, Write};

use thiserror::Error;
use tracing::debug;

use crate::domain::packet::Packet;
use crate::protocol::frame::{Frame, FrameConfig, FrameError};

/// Errors returned by [`send_packet`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The packet could not be framed.
    #[error("framing failed: {0}")]
    Frame(#[from] FrameError),

    /// The sink rejected the bytes.
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),
}

/// Destination for complete encoded frames.
pub trait FrameSink {
    /// Writes one complete frame.
    ///
    /// # Errors
    ///
    /// Returns any I/O error reported by the underlying transport.
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// [`FrameSink`] over any [`Write`] implementation.
///
/// Each frame is written in full and then flushed.
#[derive(Debug)]
pub struct IoSink<W: Write> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> FrameSink for IoSink<W> {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.inner.write_all(frame)?;
        self.inner.flush()
    }
}

/// A sink that records every frame instead of transmitting it.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Frames in the order they were sent.
    pub frames: Vec<Vec<u8>>,
    /// When `true`, every send fails with [`io::ErrorKind::BrokenPipe`].
    pub should_fail: bool,
}

impl MemorySink {
    /// Creates an empty sink with `should_fail = false`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        if self.should_fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock failure"));
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}

/// Frames `packet` under `config` and hands the bytes to `sink`.
///
/// Returns the number of bytes sent.
///
/// # Errors
///
/// - [`TransportError::Frame`] if the packet is not valid or too large.
/// - [`TransportError::Io`] if the sink fails.
///
/// # Examples
///
/// ```rust
/// use wuart_core::protocol::frame::FrameConfig;
/// use wuart_core::protocol::transport::{send_packet, MemorySink};
/// use wuart_core::Packet;
///
/// let packet = Packet::with_key_value("baud", b"115200").unwrap();
/// let mut sink = MemorySink::new();
///
/// let sent = send_packet(&mut sink, &packet, &FrameConfig::default()).unwrap();
/// assert_eq!(sent, sink.frames[0].len());
/// ```
pub fn send_packet<S: FrameSink + ?Sized>(
    sink: &mut S,
    packet: &Packet,
    config: &FrameConfig,
) -> Result<usize, TransportError> {
    let bytes = Frame::from_packet(packet)?.encode(config)?;
    sink.send_frame(&bytes)?;
    debug!(key = packet.key(), len = bytes.len(), "frame sent");
    Ok(bytes.len())
}
