//! Application layer use cases for the packet tool.
//!
//! Each use case takes plain inputs (strings from the command line, bytes
//! read from somewhere) and returns plain outputs, so they can be tested
//! without a terminal or a serial port.
//!
//! # Sub-modules
//!
//! - **`hex`**          – Reading hex text in the formats people paste
//!   (`\23\24…`, `0x2324…`, `2324…`) and writing the `\XX` wire format.
//! - **`build_frame`**  – Turns a key and an optional value into wire bytes.
//! - **`parse_frames`** – Finds every packet in a captured byte stream.
//! - **`escape_text`**  – Runs the escape codec on a single value.

pub mod build_frame;
pub mod escape_text;
pub mod hex;
pub mod parse_frames;

use thiserror::Error;

use wuart_core::{FrameError, PacketError};

/// Errors returned by the packet tool use cases.
#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    /// The argument is not valid hex text.
    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    /// The key/value pair does not form a valid packet.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// The packet could not be framed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}
