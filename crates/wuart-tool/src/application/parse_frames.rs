//! Use case: recover packets from a captured byte stream.

use tracing::{info, warn};

use wuart_core::protocol::parser::ParserStats;
use wuart_core::{FrameConfig, FrameParser, Packet};

use super::hex;

/// Packets found in a stream, plus what the parser had to skip.
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub packets: Vec<Packet>,
    /// Frames whose checksum matched but whose payload is not a packet.
    pub rejected: usize,
    pub stats: ParserStats,
}

/// Runs `bytes` through a fresh [`FrameParser`] and finishes it, so an
/// incomplete frame at the end is counted rather than held.
///
/// With `unescape_values` every packet value is passed through the escape
/// decoder.
pub fn parse_stream(bytes: &[u8], config: &FrameConfig, unescape_values: bool) -> ParseReport {
    let mut parser = FrameParser::new(config);
    let mut report = ParseReport::default();

    let mut frames = parser.push(bytes);
    frames.extend(parser.finish());

    for frame in frames {
        match frame.to_packet() {
            Ok(mut packet) => {
                if unescape_values {
                    if let Err(err) = packet.decode_value() {
                        warn!(%err, key = packet.key(), "value left escaped");
                    }
                }
                report.packets.push(packet);
            }
            Err(err) => {
                warn!(%err, "frame payload is not a packet");
                report.rejected += 1;
            }
        }
    }

    report.stats = parser.stats();
    info!(
        packets = report.packets.len(),
        discarded = report.stats.discarded_bytes,
        abandoned = report.stats.abandoned,
        "stream parsed"
    );
    report
}

/// Renders one found packet as `key=<key> val=<value> checksum=0xNN`.
pub fn format_packet(packet: &Packet) -> String {
    format!(
        "key={} val={} checksum=0x{:02X}",
        packet.key(),
        hex::render_value(packet.value()),
        packet.checksum()
    )
}

impl ParseReport {
    /// One line per packet followed by a summary line.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.packets.iter().map(format_packet).collect();
        lines.push(format!(
            "{} packet(s), {} checksum failure(s), {} oversized, {} rejected, {} incomplete, {} byte(s) discarded",
            self.packets.len(),
            self.stats.checksum_failures,
            self.stats.oversized,
            self.rejected,
            self.stats.abandoned,
            self.stats.discarded_bytes
        ));
        lines
    }
}
