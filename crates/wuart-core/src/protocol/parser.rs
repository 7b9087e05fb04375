//! Streaming frame parser for a byte-oriented transport.
//!
//! A serial link delivers bytes in arbitrary chunks: a frame may be split over
//! several reads, several frames may arrive in one read, and line noise may
//! appear anywhere.  [`FrameParser`] buffers incoming bytes and extracts every
//! complete, checksum-valid frame.
//!
//! # Resynchronization
//!
//! - Bytes before the next start symbol are discarded.
//! - When the declared length exceeds the limit, or the checksum does not
//!   match, the two start bytes are dropped and scanning resumes right after
//!   them.  A start symbol that happened to appear inside corrupted data is
//!   therefore never mistaken for a committed frame boundary.
//! - An incomplete frame stays buffered until more bytes arrive, unless a
//!   complete, checksum-valid frame already sits behind it in the buffer.  In
//!   that case the stalled candidate's length field is taken to be corrupt and
//!   the candidate is abandoned like a checksum failure.
//! - [`FrameParser::finish`] marks the end of input: a candidate still waiting
//!   for bytes is abandoned and the rest of the buffer is rescanned.
//! - A trailing end symbol is consumed when it arrives together with its
//!   frame; if it arrives later it is discarded as inter-frame noise.

use tracing::{debug, warn, Level};

use crate::diag::{log_buffer, DumpStyle};
use crate::protocol::frame::{decode_frame, Frame, FrameConfig, FrameError, START_BYTES};

/// Counters describing what the parser has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames successfully extracted.
    pub frames: u64,
    /// Candidate frames dropped because of a checksum mismatch.
    pub checksum_failures: u64,
    /// Candidate frames dropped because of an oversized length field.
    pub oversized: u64,
    /// Candidate frames abandoned while still waiting for payload bytes.
    pub abandoned: u64,
    /// Bytes thrown away while searching for a start symbol.
    pub discarded_bytes: u64,
}

/// Outcome of one extraction attempt.
enum Step {
    Frame(Frame),
    Skipped,
    NeedMore,
}

/// Incremental frame extractor.
#[derive(Debug, Clone)]
pub struct FrameParser {
    buffer: Vec<u8>,
    max_payload_len: u32,
    stats: ParserStats,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl FrameParser {
    /// Creates a parser that accepts payloads up to `config.max_payload_len`.
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            buffer: Vec::new(),
            max_payload_len: config.max_payload_len,
            stats: ParserStats::default(),
        }
    }

    /// Appends `data` and returns every complete frame now available.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wuart_core::protocol::frame::{encode_frame, FrameConfig};
    /// use wuart_core::protocol::parser::FrameParser;
    ///
    /// let bytes = encode_frame(b"start", &FrameConfig::default()).unwrap();
    /// let mut parser = FrameParser::default();
    ///
    /// assert!(parser.push(&bytes[..4]).is_empty());
    /// let frames = parser.push(&bytes[4..]);
    /// assert_eq!(frames[0].payload(), b"start");
    /// ```
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(data);
        let mut frames = Vec::new();
        loop {
            match self.try_extract_one() {
                Step::Frame(frame) => frames.push(frame),
                Step::Skipped => continue,
                Step::NeedMore => break,
            }
        }
        frames
    }

    /// Signals the end of input and returns any frames still recoverable.
    ///
    /// Every candidate still waiting for bytes is abandoned, and whatever
    /// follows it is rescanned.  The buffer is empty afterwards.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            frames.extend(self.push(&[]));
            if self.buffer.is_empty() {
                break;
            }
            if self.buffer.starts_with(&START_BYTES) {
                warn!(buffered = self.buffer.len(), "abandoning incomplete frame at end of input");
                self.stats.abandoned += 1;
                self.discard(START_BYTES.len());
            } else {
                self.discard(self.buffer.len());
            }
        }
        frames
    }

    /// Bytes currently held while waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Counters accumulated since creation or the last [`reset`](Self::reset).
    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Drops all buffered bytes and zeroes the counters.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.stats = ParserStats::default();
    }

    fn try_extract_one(&mut self) -> Step {
        if !self.sync_to_start() {
            return Step::NeedMore;
        }
        match decode_frame(&self.buffer, self.max_payload_len) {
            Ok((frame, consumed)) => {
                self.buffer.drain(..consumed);
                self.stats.frames += 1;
                debug!(len = frame.payload().len(), "frame found");
                Step::Frame(frame)
            }
            Err(FrameError::InsufficientData { .. }) => {
                if self.complete_frame_behind_head() {
                    warn!("abandoning stalled candidate: a complete frame follows it");
                    self.stats.abandoned += 1;
                    self.discard(START_BYTES.len());
                    Step::Skipped
                } else {
                    Step::NeedMore
                }
            }
            Err(err) => {
                match err {
                    FrameError::ChecksumMismatch { .. } => self.stats.checksum_failures += 1,
                    FrameError::PayloadTooLarge { .. } => self.stats.oversized += 1,
                    _ => {}
                }
                warn!(%err, "dropping candidate frame");
                self.discard(START_BYTES.len());
                Step::Skipped
            }
        }
    }

    /// Discards bytes up to the next start symbol.
    ///
    /// Returns `true` if the buffer now begins with a start symbol.  A lone
    /// first start byte at the very end is kept, since its partner may be in
    /// the next read.
    fn sync_to_start(&mut self) -> bool {
        match find_start(&self.buffer) {
            Some(0) => true,
            Some(idx) => {
                self.discard(idx);
                true
            }
            None => {
                let keep = usize::from(self.buffer.last() == Some(&START_BYTES[0]));
                self.discard(self.buffer.len() - keep);
                false
            }
        }
    }

    /// Returns `true` if a later start symbol in the buffer begins a complete,
    /// checksum-valid frame.
    fn complete_frame_behind_head(&self) -> bool {
        let mut from = START_BYTES.len();
        while let Some(rel) = find_start(&self.buffer[from..]) {
            let idx = from + rel;
            if decode_frame(&self.buffer[idx..], self.max_payload_len).is_ok() {
                return true;
            }
            from = idx + 1;
        }
        false
    }

    fn discard(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if tracing::enabled!(Level::TRACE) {
            log_buffer("discard", &self.buffer[..n], DumpStyle::HexDump, Level::TRACE);
        }
        self.buffer.drain(..n);
        self.stats.discarded_bytes += n as u64;
    }
}

fn find_start(bytes: &[u8]) -> Option<usize> {
    bytes.windows(START_BYTES.len()).position(|w| w == START_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::packet::Packet;
    use crate::protocol::frame::{encode_frame, END_BYTES, HEADER_SIZE};

    fn frame_bytes(payload: &[u8]) -> Vec<u8> {
        encode_frame(payload, &FrameConfig::default()).unwrap()
    }

    fn payloads(frames: &[Frame]) -> Vec<Vec<u8>> {
        frames.iter().map(|f| f.payload().to_vec()).collect()
    }

    #[test]
    fn test_single_frame_in_one_push() {
        let mut parser = FrameParser::default();
        let frames = parser.push(&frame_bytes(b"key2=123"));
        assert_eq!(payloads(&frames), vec![b"key2=123".to_vec()]);
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats().frames, 1);
    }

    #[test]
    fn test_frame_split_byte_by_byte() {
        // Arrange
        let bytes = frame_bytes(b"baud=115200");
        let mut parser = FrameParser::default();
        let mut frames = Vec::new();

        // Act
        for b in &bytes {
            frames.extend(parser.push(std::slice::from_ref(b)));
        }

        // Assert
        assert_eq!(payloads(&frames), vec![b"baud=115200".to_vec()]);
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut stream = frame_bytes(b"path=/dev/ttyUSB0");
        stream.extend(frame_bytes(b"baud=9600"));
        stream.extend(frame_bytes(b"start"));

        let frames = FrameParser::default().push(&stream);

        assert_eq!(
            payloads(&frames),
            vec![
                b"path=/dev/ttyUSB0".to_vec(),
                b"baud=9600".to_vec(),
                b"start".to_vec()
            ]
        );
    }

    #[test]
    fn test_leading_garbage_is_discarded() {
        let mut stream = b"noise\x00\xff".to_vec();
        stream.extend(frame_bytes(b"stop"));

        let mut parser = FrameParser::default();
        let frames = parser.push(&stream);

        assert_eq!(payloads(&frames), vec![b"stop".to_vec()]);
        assert_eq!(parser.stats().discarded_bytes, 7);
    }

    #[test]
    fn test_trailing_end_symbol_is_consumed() {
        let config = FrameConfig {
            append_end_symbol: true,
            ..FrameConfig::default()
        };
        let mut stream = encode_frame(b"stop", &config).unwrap();
        stream.extend(encode_frame(b"start", &config).unwrap());

        let mut parser = FrameParser::new(&config);
        let frames = parser.push(&stream);

        assert_eq!(frames.len(), 2);
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats().discarded_bytes, 0);
    }

    #[test]
    fn test_late_end_symbol_is_dropped_as_noise() {
        let mut parser = FrameParser::default();
        parser.push(&frame_bytes(b"stop"));
        let mut next = END_BYTES.to_vec();
        next.extend(frame_bytes(b"start"));

        let frames = parser.push(&next);

        assert_eq!(payloads(&frames), vec![b"start".to_vec()]);
        assert_eq!(parser.stats().discarded_bytes, 2);
    }

    #[test]
    fn test_corrupted_frame_is_skipped_and_next_one_found() {
        // Arrange
        let mut bad = frame_bytes(b"data=abc");
        bad[HEADER_SIZE + 1] ^= 0x20;
        let mut stream = bad;
        stream.extend(frame_bytes(b"data=xyz"));
        let mut parser = FrameParser::default();

        // Act
        let frames = parser.push(&stream);

        // Assert
        assert_eq!(payloads(&frames), vec![b"data=xyz".to_vec()]);
        assert_eq!(parser.stats().checksum_failures, 1);
    }

    #[test]
    fn test_oversized_length_is_skipped() {
        let config = FrameConfig {
            max_payload_len: 4,
            ..FrameConfig::default()
        };
        let mut stream = frame_bytes(b"data=toolong");
        stream.extend(frame_bytes(b"stop"));
        let mut parser = FrameParser::new(&config);

        let frames = parser.push(&stream);

        assert_eq!(payloads(&frames), vec![b"stop".to_vec()]);
        assert_eq!(parser.stats().oversized, 1);
    }

    #[test]
    fn test_lone_first_start_byte_is_kept_across_pushes() {
        let bytes = frame_bytes(b"start");
        let mut parser = FrameParser::default();

        assert!(parser.push(&[0x00, bytes[0]]).is_empty());
        assert_eq!(parser.buffered(), 1);
        let frames = parser.push(&bytes[1..]);

        assert_eq!(payloads(&frames), vec![b"start".to_vec()]);
    }

    #[test]
    fn test_pure_noise_is_not_retained() {
        let mut parser = FrameParser::default();
        assert!(parser.push(b"just some noise").is_empty());
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_reset_clears_buffer_and_stats() {
        let mut parser = FrameParser::default();
        parser.push(&frame_bytes(b"stop")[..5]);
        parser.reset();
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats(), ParserStats::default());
    }

    #[test]
    fn test_corrupted_length_does_not_hold_back_later_frames() {
        // Arrange – length 5 becomes 32773, still under the default limit.
        let mut bad = frame_bytes(b"start");
        bad[3] ^= 0x80;
        let mut stream = bad;
        for _ in 0..20 {
            stream.extend(frame_bytes(b"baud=9600"));
        }
        let mut parser = FrameParser::default();

        // Act
        let frames = parser.push(&stream);

        // Assert
        assert_eq!(frames.len(), 20);
        assert!(frames.iter().all(|f| f.payload() == b"baud=9600"));
        assert_eq!(parser.stats().abandoned, 1);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_corrupted_length_recovers_across_chunks() {
        // Arrange – length 4 becomes 260.
        let mut bad = frame_bytes(b"stop");
        bad[3] ^= 0x01;
        let mut stream = bad;
        stream.extend(frame_bytes(b"start"));
        let mut parser = FrameParser::default();

        // Act
        let frames: Vec<_> = stream.chunks(3).flat_map(|c| parser.push(c)).collect();

        // Assert
        assert_eq!(payloads(&frames), vec![b"start".to_vec()]);
        assert_eq!(parser.stats().abandoned, 1);
    }

    #[test]
    fn test_partial_frame_without_successor_keeps_waiting() {
        let bytes = frame_bytes(b"baud=115200");
        let mut parser = FrameParser::default();

        assert!(parser.push(&bytes[..bytes.len() - 1]).is_empty());

        assert_eq!(parser.buffered(), bytes.len() - 1);
        assert_eq!(parser.stats().abandoned, 0);
    }

    #[test]
    fn test_finish_abandons_pending_candidate_and_rescans() {
        // Arrange – a stalled 256-byte candidate, a complete frame, then a
        // header whose payload never arrives.
        let mut stream = vec![0x23, 0x24, 0x00, 0x01, 0x00, 0x00];
        stream.extend(frame_bytes(b"stop"));
        stream.extend(&frame_bytes(b"start")[..4]);
        let mut parser = FrameParser::default();

        // Act
        let pushed = parser.push(&stream);
        let flushed = parser.finish();

        // Assert
        assert_eq!(payloads(&pushed), vec![b"stop".to_vec()]);
        assert!(flushed.is_empty());
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.stats().abandoned, 2);
    }

    #[test]
    fn test_finish_on_empty_parser_is_noop() {
        let mut parser = FrameParser::default();
        assert!(parser.finish().is_empty());
        assert_eq!(parser.stats(), ParserStats::default());
    }

    #[test]
    fn test_frames_convert_back_to_packets() {
        let packet = Packet::with_key_value("data", &[0x00, 0x23, 0x24, 0xFF]).unwrap();
        let bytes = Frame::from_packet(&packet)
            .unwrap()
            .encode(&FrameConfig::default())
            .unwrap();

        let frames = FrameParser::default().push(&bytes);

        assert_eq!(frames[0].to_packet().unwrap(), packet);
    }
}
