//! Packet data model.
//!
//! This module holds the in-memory key/value packet and the buffer helpers it
//! uses to swap its contents without losing state on allocation failure.  It
//! knows nothing about frames or transports.

pub mod buffer;

/// The key/value packet and its lifecycle.
///
/// See [`packet::Packet`] for the main type.
pub mod packet;
