//! # Decoder Module
//!
//! Pulse-width decoding of the Efergy transmitter's edge-encoded stream.
//!
//! This module handles:
//! - Monotonic timestamping of line transitions
//! - Bit classification by majority high/low time within a bit cell
//! - Resynchronization after noise or idle-line gaps
//! - LSB-first byte assembly with on-wire bit-order reversal

pub mod bit;
pub mod clock;

pub use bit::{BitDecoder, Level, Transition};
pub use clock::EdgeClock;
