//! # Bit Decoder
//!
//! Converts timestamped line transitions into completed bytes.
//!
//! The Efergy transmitter keys its data onto the line at roughly 4800 bps.
//! A bit cell runs from one falling edge to the next; the fraction of the
//! cell spent high encodes the bit: high for more than half the cell is a 1,
//! otherwise a 0. Bits arrive least-significant first; the on-wire byte
//! order is the reverse, so a finished byte is bit-reversed before emission.

/// Nominal line bit rate of the transmitter
pub const BIT_RATE_BPS: u32 = 4800;

/// Bit cells at or above this length are noise or an idle line, not data.
/// At ~4800 bps a valid cell is ~208 µs; a quarter millisecond is already
/// out of band.
pub const MAX_CYCLE_NS: u64 = 250_000;

/// Logical level of the monitored line after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// A single observed line transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Level the line settled at
    pub level: Level,

    /// Monotonic timestamp of the transition, from [`EdgeClock`](super::EdgeClock)
    pub timestamp_ns: u64,
}

/// Pulse-width bit decoder.
///
/// Owns the complete decoding state: the two timing anchors and the
/// in-progress byte. One instance belongs to exactly one edge-processing
/// context; nothing here is shared or synchronized.
///
/// # Example
///
/// ```
/// use efergy_rx::decoder::{BitDecoder, Level, Transition};
///
/// let mut decoder = BitDecoder::new();
///
/// // First falling edge after startup only synchronizes.
/// decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 300_000 });
///
/// // A cell that is high for 150 of its 200 µs decodes as a 1.
/// decoder.on_edge(Transition { level: Level::High, timestamp_ns: 350_000 });
/// let byte = decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 500_000 });
/// assert!(byte.is_none()); // seven bits still to go
/// ```
#[derive(Debug)]
pub struct BitDecoder {
    /// Timestamp of the most recent rising edge
    last_rising_ns: u64,

    /// Timestamp of the most recent falling edge; anchors the bit cell
    last_falling_ns: u64,

    /// Position of the next bit within the in-progress byte, always in [0, 8)
    bit_index: u8,

    /// Bits accumulated so far, least-significant first
    partial_byte: u8,
}

impl BitDecoder {
    /// Create a decoder with zeroed state.
    ///
    /// The zero anchors guarantee the first observed cell measures as
    /// arbitrarily long and lands in the resync branch, so decoding only
    /// starts on clean back-to-back cells.
    pub fn new() -> Self {
        Self {
            last_rising_ns: 0,
            last_falling_ns: 0,
            bit_index: 0,
            partial_byte: 0,
        }
    }

    /// Process one line transition, returning a byte when one completes.
    ///
    /// A rising edge only records its timestamp. A falling edge closes the
    /// current bit cell: a cell of [`MAX_CYCLE_NS`] or longer discards any
    /// partial byte and resynchronizes; a shorter cell classifies its bit by
    /// strict majority of high time (a tie is a 0). The eighth bit completes
    /// a byte, which is emitted bit-reversed.
    ///
    /// Malformed timing is never an error; the resync policy absorbs it.
    #[inline]
    pub fn on_edge(&mut self, transition: Transition) -> Option<u8> {
        match transition.level {
            Level::High => {
                self.last_rising_ns = transition.timestamp_ns;
                None
            }
            Level::Low => {
                let now = transition.timestamp_ns;
                let cycle = now.wrapping_sub(self.last_falling_ns);

                let completed = if cycle < MAX_CYCLE_NS {
                    let high = now.wrapping_sub(self.last_rising_ns);
                    if high > cycle / 2 {
                        self.partial_byte |= 1 << self.bit_index;
                    }
                    self.bit_index += 1;

                    if self.bit_index == 8 {
                        // The wire is LSB-first relative to byte order.
                        let byte = self.partial_byte.reverse_bits();
                        self.bit_index = 0;
                        self.partial_byte = 0;
                        Some(byte)
                    } else {
                        None
                    }
                } else {
                    self.bit_index = 0;
                    self.partial_byte = 0;
                    None
                };

                self.last_falling_ns = now;
                completed
            }
        }
    }

    /// Discard all decoding state.
    pub fn reset(&mut self) {
        self.last_rising_ns = 0;
        self.last_falling_ns = 0;
        self.bit_index = 0;
        self.partial_byte = 0;
    }
}

impl Default for BitDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One valid 200 µs bit cell per entry; a 1 keeps the line high for
    /// 150 µs of the cell, a 0 for only 50 µs.
    fn feed_bits(decoder: &mut BitDecoder, start_ns: u64, bits: &[u8]) -> Vec<u8> {
        let mut emitted = Vec::new();
        let mut cell_start = start_ns;

        // Synchronizing falling edge; the cell it closes is over-length.
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: cell_start });

        for &bit in bits {
            let rise = cell_start + if bit != 0 { 50_000 } else { 150_000 };
            let fall = cell_start + 200_000;

            decoder.on_edge(Transition { level: Level::High, timestamp_ns: rise });
            if let Some(byte) = decoder.on_edge(Transition { level: Level::Low, timestamp_ns: fall }) {
                emitted.push(byte);
            }
            cell_start = fall;
        }

        emitted
    }

    #[test]
    fn test_rising_edge_emits_nothing() {
        let mut decoder = BitDecoder::new();
        for t in [0u64, 1_000, 500_000, 10_000_000] {
            assert!(decoder.on_edge(Transition { level: Level::High, timestamp_ns: t }).is_none());
        }
        assert_eq!(decoder.bit_index, 0);
        assert_eq!(decoder.partial_byte, 0);
    }

    #[test]
    fn test_first_falling_edge_only_synchronizes() {
        let mut decoder = BitDecoder::new();
        let result = decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 2_000_000 });
        assert!(result.is_none());
        assert_eq!(decoder.bit_index, 0);
        assert_eq!(decoder.last_falling_ns, 2_000_000);
    }

    #[test]
    fn test_gap_resets_partial_byte() {
        let mut decoder = BitDecoder::new();

        // Three good bits...
        feed_bits(&mut decoder, 300_000, &[1, 1, 1]);
        assert_eq!(decoder.bit_index, 3);
        assert_eq!(decoder.partial_byte, 0b111);

        // ...then the line goes quiet for a millisecond.
        let idle_fall = decoder.last_falling_ns + 1_000_000;
        let result = decoder.on_edge(Transition { level: Level::Low, timestamp_ns: idle_fall });

        assert!(result.is_none());
        assert_eq!(decoder.bit_index, 0);
        assert_eq!(decoder.partial_byte, 0);
        // The gap edge still anchors the next cell.
        assert_eq!(decoder.last_falling_ns, idle_fall);
    }

    #[test]
    fn test_gap_threshold_is_closed_at_250us() {
        // Exactly 250 µs between falling edges must reject the cell.
        let mut decoder = BitDecoder::new();
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 300_000 });
        decoder.on_edge(Transition { level: Level::High, timestamp_ns: 350_000 });
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 550_000 });
        assert_eq!(decoder.bit_index, 0);

        // One nanosecond shorter is a valid cell.
        let mut decoder = BitDecoder::new();
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 300_000 });
        decoder.on_edge(Transition { level: Level::High, timestamp_ns: 350_000 });
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 549_999 });
        assert_eq!(decoder.bit_index, 1);
    }

    #[test]
    fn test_half_cycle_tie_is_zero() {
        let mut decoder = BitDecoder::new();
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 300_000 });
        // 200 µs cell, high for exactly half of it.
        decoder.on_edge(Transition { level: Level::High, timestamp_ns: 400_000 });
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 500_000 });

        assert_eq!(decoder.bit_index, 1);
        assert_eq!(decoder.partial_byte, 0);
    }

    #[test]
    fn test_one_nanosecond_past_half_is_one() {
        let mut decoder = BitDecoder::new();
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 300_000 });
        decoder.on_edge(Transition { level: Level::High, timestamp_ns: 399_999 });
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: 500_000 });

        assert_eq!(decoder.bit_index, 1);
        assert_eq!(decoder.partial_byte, 1);
    }

    #[test]
    fn test_byte_assembly_is_lsb_first_then_reversed() {
        let mut decoder = BitDecoder::new();
        let emitted = feed_bits(&mut decoder, 300_000, &[1, 0, 1, 1, 0, 0, 1, 0]);

        // LSB-first accumulation of 1,0,1,1,0,0,1,0 is 0b0100_1101.
        assert_eq!(emitted, vec![0b0100_1101u8.reverse_bits()]);
        assert_eq!(emitted, vec![0xB2]);

        // Emission resets the in-progress byte.
        assert_eq!(decoder.bit_index, 0);
        assert_eq!(decoder.partial_byte, 0);
    }

    #[test]
    fn test_all_ones_and_all_zeros() {
        let mut decoder = BitDecoder::new();
        assert_eq!(feed_bits(&mut decoder, 300_000, &[1; 8]), vec![0xFF]);

        let mut decoder = BitDecoder::new();
        assert_eq!(feed_bits(&mut decoder, 300_000, &[0; 8]), vec![0x00]);
    }

    #[test]
    fn test_consecutive_bytes_decode_independently() {
        let mut decoder = BitDecoder::new();
        let emitted = feed_bits(
            &mut decoder,
            300_000,
            &[
                1, 0, 1, 1, 0, 0, 1, 0, // 0xB2
                0, 0, 0, 0, 1, 0, 0, 1, // LSB-first 0b1001_0000, reversed 0x09
            ],
        );
        assert_eq!(emitted, vec![0xB2, 0x09]);
    }

    #[test]
    fn test_resync_discards_then_decodes_cleanly() {
        let mut decoder = BitDecoder::new();

        // Five bits in, then a dropout.
        feed_bits(&mut decoder, 300_000, &[1, 1, 0, 1, 1]);
        let idle_fall = decoder.last_falling_ns + 5_000_000;
        decoder.on_edge(Transition { level: Level::Low, timestamp_ns: idle_fall });

        // A full byte after the dropout comes out untainted.
        let emitted = feed_bits(&mut decoder, idle_fall + 400_000, &[0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(emitted, vec![0b1010_1010u8.reverse_bits()]);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut decoder = BitDecoder::new();
        feed_bits(&mut decoder, 300_000, &[1, 1, 1]);

        decoder.reset();
        assert_eq!(decoder.bit_index, 0);
        assert_eq!(decoder.partial_byte, 0);
        assert_eq!(decoder.last_rising_ns, 0);
        assert_eq!(decoder.last_falling_ns, 0);
    }

    #[test]
    fn test_nominal_cell_fits_under_threshold() {
        // ~4800 bps means a ~208 µs cell, comfortably below the cutoff.
        let nominal_cell_ns = 1_000_000_000u64 / BIT_RATE_BPS as u64;
        assert!(nominal_cell_ns < MAX_CYCLE_NS);
    }
}
