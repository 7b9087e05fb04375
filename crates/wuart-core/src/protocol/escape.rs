//! Backslash escape codec that makes arbitrary bytes safe to carry as
//! printable text.
//!
//! Encoding rules:
//! ```text
//! 0x20..=0x7E except '\'   copied literally
//! '\' (0x5C)               "\\"
//! anything else            "\xHH"  (two lowercase hex digits)
//! ```
//!
//! Decoding is a four-state machine ([`DecodeState`]).  Malformed escape
//! sequences are not fatal: the offending characters are passed through
//! literally and a `warn` event is logged, so a receiver never loses data
//! because a sender produced a sloppy escape.  [`decode_strict`] is available
//! for callers that would rather reject such input.
//!
//! All bounded operations return [`EscapeError::InsufficientCapacity`] the
//! moment the next emission does not fit.  Bytes written before that point are
//! **not** rolled back; treat the destination as garbage on error.

use std::convert::Infallible;

use thiserror::Error;
use tracing::{debug, warn};

/// The escape introducer.
pub const ESCAPE: u8 = b'\\';

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Errors that can occur while encoding or decoding escaped text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EscapeError {
    /// The next emission needs more room than the output has left.
    #[error("insufficient output capacity: need {needed} bytes, {available} available")]
    InsufficientCapacity { needed: usize, available: usize },

    /// A backslash sequence that is neither `\\` nor `\xHH` (strict mode only).
    #[error("malformed escape sequence at input offset {offset}")]
    MalformedEscape { offset: usize },
}

/// Returns `true` for bytes that are copied through unescaped, ignoring the
/// special case of the backslash itself.
pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Returns the escaped form of one byte and its length (1, 2 or 4).
fn escape_byte(byte: u8) -> ([u8; 4], usize) {
    if byte == ESCAPE {
        ([ESCAPE, ESCAPE, 0, 0], 2)
    } else if is_printable(byte) {
        ([byte, 0, 0, 0], 1)
    } else {
        (
            [
                ESCAPE,
                b'x',
                HEX_DIGITS[(byte >> 4) as usize],
                HEX_DIGITS[(byte & 0x0F) as usize],
            ],
            4,
        )
    }
}

/// Number of bytes `input` occupies once encoded.
pub fn encoded_len(input: &[u8]) -> usize {
    input.iter().map(|&b| escape_byte(b).1).sum()
}

/// Encodes `input` into a freshly allocated buffer of exactly the right size.
///
/// # Examples
///
/// ```rust
/// use wuart_core::protocol::escape::encode;
///
/// assert_eq!(encode(&[0x0D]), b"\\x0d");
/// assert_eq!(encode(b"a\\b"), b"a\\\\b");
/// ```
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(input));
    for &b in input {
        let (chunk, len) = escape_byte(b);
        out.extend_from_slice(&chunk[..len]);
    }
    out
}

/// Encodes `input` into `out`, returning the number of bytes written.
///
/// # Errors
///
/// Returns [`EscapeError::InsufficientCapacity`] as soon as the escape for the
/// next input byte does not fit in the remaining space of `out`.
pub fn encode_into(input: &[u8], out: &mut [u8]) -> Result<usize, EscapeError> {
    let mut writer = BoundedWriter::new(out);
    for &b in input {
        let (chunk, len) = escape_byte(b);
        writer.put(&chunk[..len])?;
    }
    Ok(writer.written())
}

/// Encodes `input` with an upper bound of `capacity` output bytes.
///
/// # Errors
///
/// Returns [`EscapeError::InsufficientCapacity`] if the encoded form would
/// exceed `capacity`.
pub fn encode_with_capacity(input: &[u8], capacity: usize) -> Result<Vec<u8>, EscapeError> {
    let mut out = vec![0u8; capacity];
    let len = encode_into(input, &mut out)?;
    out.truncate(len);
    Ok(out)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decoder state between two input bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// Plain text.
    #[default]
    Normal,
    /// A backslash has been read.
    SawBackslash,
    /// `\x` has been read; waiting for the high nibble.
    ExpectHex1,
    /// `\xH` has been read; the held byte is the high nibble character.
    ExpectHex2(u8),
}

/// Output produced by a single decoder transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Nothing,
    Byte(u8),
    /// Characters of a malformed sequence, passed through unchanged.
    Recovered { bytes: [u8; 4], len: usize },
}

impl Emit {
    fn recovered(parts: &[u8]) -> Self {
        let mut bytes = [0u8; 4];
        bytes[..parts.len()].copy_from_slice(parts);
        Emit::Recovered {
            bytes,
            len: parts.len(),
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            Emit::Nothing => &[],
            Emit::Byte(b) => std::slice::from_ref(b),
            Emit::Recovered { bytes, len } => &bytes[..*len],
        }
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn on_normal(byte: u8) -> (DecodeState, Emit) {
    if byte == ESCAPE {
        (DecodeState::SawBackslash, Emit::Nothing)
    } else {
        (DecodeState::Normal, Emit::Byte(byte))
    }
}

fn on_backslash(byte: u8) -> (DecodeState, Emit) {
    match byte {
        ESCAPE => (DecodeState::Normal, Emit::Byte(ESCAPE)),
        b'x' | b'X' => (DecodeState::ExpectHex1, Emit::Nothing),
        other => (DecodeState::Normal, Emit::recovered(&[ESCAPE, other])),
    }
}

fn on_hex1(byte: u8) -> (DecodeState, Emit) {
    if hex_value(byte).is_some() {
        (DecodeState::ExpectHex2(byte), Emit::Nothing)
    } else {
        (DecodeState::Normal, Emit::recovered(&[ESCAPE, b'x', byte]))
    }
}

fn on_hex2(high: u8, byte: u8) -> (DecodeState, Emit) {
    match (hex_value(high), hex_value(byte)) {
        (Some(h), Some(l)) => {
            let decoded = (h << 4) | l;
            debug!("decoded: \\x{decoded:02x}");
            (DecodeState::Normal, Emit::Byte(decoded))
        }
        _ => (
            DecodeState::Normal,
            Emit::recovered(&[ESCAPE, b'x', high, byte]),
        ),
    }
}

/// Incremental escape decoder.
///
/// Feed bytes with `step` and call `finish` at the end of input to flush any
/// half-read escape sequence.
#[derive(Debug, Clone, Default)]
pub(crate) struct Decoder {
    state: DecodeState,
    recovered: usize,
}

impl Decoder {
    /// Creates a decoder in [`DecodeState::Normal`].
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current state of the machine.
    pub(crate) fn state(&self) -> DecodeState {
        self.state
    }

    /// Number of malformed sequences passed through so far.
    pub(crate) fn recovered(&self) -> usize {
        self.recovered
    }

    fn step(&mut self, byte: u8) -> Emit {
        let (next, emit) = match self.state {
            DecodeState::Normal => on_normal(byte),
            DecodeState::SawBackslash => on_backslash(byte),
            DecodeState::ExpectHex1 => on_hex1(byte),
            DecodeState::ExpectHex2(high) => on_hex2(high, byte),
        };
        self.state = next;
        self.note(emit)
    }

    /// Flushes a pending partial escape at end of input.
    fn finish(&mut self) -> Emit {
        let emit = match self.state {
            DecodeState::Normal => Emit::Nothing,
            DecodeState::SawBackslash => Emit::recovered(&[ESCAPE]),
            DecodeState::ExpectHex1 => Emit::recovered(&[ESCAPE, b'x']),
            DecodeState::ExpectHex2(high) => Emit::recovered(&[ESCAPE, b'x', high]),
        };
        self.state = DecodeState::Normal;
        self.note(emit)
    }

    fn note(&mut self, emit: Emit) -> Emit {
        if let Emit::Recovered { .. } = emit {
            self.recovered += 1;
            warn!(
                sequence = %String::from_utf8_lossy(emit.as_slice()).escape_debug(),
                "decode fail: malformed escape passed through"
            );
        }
        emit
    }
}

/// Result of a bounded decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Bytes written to the output.
    pub len: usize,
    /// Malformed sequences that were passed through literally.
    pub recovered: usize,
}

/// Drives a [`Decoder`] over `input`, handing each emission to `sink`.
///
/// `sink` receives the input offset of the byte that completed the emission.
fn drive<E, F>(input: &[u8], mut sink: F) -> Result<usize, E>
where
    F: FnMut(usize, Emit) -> Result<(), E>,
{
    let mut decoder = Decoder::new();
    for (i, &b) in input.iter().enumerate() {
        let emit = decoder.step(b);
        sink(i, emit)?;
    }
    let tail = decoder.finish();
    sink(input.len(), tail)?;
    Ok(decoder.recovered())
}

/// Decodes `input` into `out`, reporting both the length and the number of
/// recovered malformed sequences.
///
/// # Errors
///
/// Returns [`EscapeError::InsufficientCapacity`] as soon as an emission does
/// not fit in the remaining space of `out`.
pub fn decode_report(input: &[u8], out: &mut [u8]) -> Result<DecodeOutcome, EscapeError> {
    let mut writer = BoundedWriter::new(out);
    let recovered = drive(input, |_, emit| writer.put(emit.as_slice()))?;
    Ok(DecodeOutcome {
        len: writer.written(),
        recovered,
    })
}

/// Decodes `input` into `out`, returning the number of bytes written.
///
/// # Errors
///
/// Returns [`EscapeError::InsufficientCapacity`] as soon as an emission does
/// not fit in the remaining space of `out`.
///
/// # Examples
///
/// ```rust
/// use wuart_core::protocol::escape::decode_into;
///
/// let mut out = [0u8; 4];
/// let n = decode_into(b"\\x0d", &mut out).unwrap();
/// assert_eq!(&out[..n], &[0x0D]);
/// ```
pub fn decode_into(input: &[u8], out: &mut [u8]) -> Result<usize, EscapeError> {
    decode_report(input, out).map(|outcome| outcome.len)
}

/// Decodes `input` into a new buffer.
///
/// Decoding never produces more bytes than it consumes, so this cannot run out
/// of room.
pub fn decode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let drained = drive::<Infallible, _>(input, |_, emit| {
        out.extend_from_slice(emit.as_slice());
        Ok(())
    });
    match drained {
        Ok(_) => out,
        Err(never) => match never {},
    }
}

/// Decodes `input`, rejecting any malformed escape sequence.
///
/// # Errors
///
/// Returns [`EscapeError::MalformedEscape`] with the input offset of the
/// backslash that started the first malformed sequence.
pub fn decode_strict(input: &[u8]) -> Result<Vec<u8>, EscapeError> {
    let mut out = Vec::with_capacity(input.len());
    let mut escape_start = 0;
    let mut decoder = Decoder::new();
    for (i, &b) in input.iter().enumerate() {
        if decoder.state() == DecodeState::Normal && b == ESCAPE {
            escape_start = i;
        }
        match decoder.step(b) {
            Emit::Recovered { .. } => {
                return Err(EscapeError::MalformedEscape {
                    offset: escape_start,
                })
            }
            emit => out.extend_from_slice(emit.as_slice()),
        }
    }
    if let Emit::Recovered { .. } = decoder.finish() {
        return Err(EscapeError::MalformedEscape {
            offset: escape_start,
        });
    }
    Ok(out)
}

// ── Bounded output ────────────────────────────────────────────────────────────

/// Write cursor over a caller-provided slice that refuses to overrun it.
struct BoundedWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl<'a> BoundedWriter<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Self { out, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), EscapeError> {
        let available = self.out.len() - self.pos;
        if bytes.len() > available {
            return Err(EscapeError::InsufficientCapacity {
                needed: bytes.len(),
                available,
            });
        }
        self.out[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    fn written(&self) -> usize {
        self.pos
    }
}
