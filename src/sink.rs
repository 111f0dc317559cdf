//! Lock-free SPSC (Single Producer, Single Consumer) byte sink.
//!
//! Decouples the time-critical edge-watcher thread from whoever drains the
//! decoded bytes.
//!
//! ```text
//! EdgeWatcher ──────▶ ByteSink ──────▶ Session::read
//!                    (lock-free)
//! ```
//!
//! The producer side never blocks, never allocates, and never overwrites:
//! a full sink drops the incoming byte and reports the failure to the
//! caller. The consumer side never blocks either; an empty sink yields an
//! empty read.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default sink capacity in bytes.
/// At ~600 decoded bytes/second this is well over a fifth of a second of
/// slack for the consumer.
pub const DEFAULT_SINK_CAPACITY: usize = 128;

/// Lock-free SPSC ring buffer of decoded bytes.
///
/// # Safety
///
/// This type uses `UnsafeCell` internally but is safe to use because:
/// - Single producer, single consumer (enforced by design: one watcher
///   thread pushes, one exclusive [`Session`](crate::device::Session) reads)
/// - The producer only writes slots in `[head, head + N)` and only ever
///   moves `tail`; the consumer only reads slots in `[head, tail)` and only
///   ever moves `head`
/// - All coordination through atomic operations
///
/// # Memory Ordering
///
/// - Producer stores `tail` with `Release` after the slot write; consumer
///   loads it with `Acquire` before reading slots
/// - Consumer stores `head` with `Release` after consuming slots; producer
///   loads it with `Acquire` before reusing them
pub struct ByteSink<const N: usize = DEFAULT_SINK_CAPACITY> {
    /// Ring buffer of decoded bytes.
    slots: UnsafeCell<[u8; N]>,

    /// Next read index (monotonically increasing, wraps via mask).
    head: AtomicUsize,

    /// Next write index (monotonically increasing, wraps via mask).
    tail: AtomicUsize,
}

// SAFETY: Single producer, single consumer, atomic coordination. The
// index discipline above rules out aliased access to any slot.
unsafe impl<const N: usize> Sync for ByteSink<N> {}
unsafe impl<const N: usize> Send for ByteSink<N> {}

impl<const N: usize> ByteSink<N> {
    /// Mask for wrapping an index to the buffer size.
    /// N must be a power of 2.
    const MASK: usize = N - 1;

    /// Create a new empty sink.
    ///
    /// # Panics
    ///
    /// Panics if N is not a power of 2.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Sink capacity must be power of 2");

        Self {
            slots: UnsafeCell::new([0u8; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Push one byte at the tail.
    ///
    /// Returns `false` without disturbing existing contents when the sink
    /// is full. Safe to call from the edge-watcher context: O(1), no locks,
    /// no allocation.
    #[inline]
    pub fn push(&self, byte: u8) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) == N {
            return false;
        }

        // SAFETY: The slot at `tail` is outside `[head, tail)`, so the
        // consumer is not reading it, and this thread is the only writer.
        unsafe {
            (*self.slots.get())[tail & Self::MASK] = byte;
        }

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Remove and return up to `max_len` bytes from the head, FIFO order.
    ///
    /// An empty sink yields an empty vector immediately; that is a normal
    /// outcome, not an error.
    pub fn read(&self, max_len: usize) -> Vec<u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let available = tail.wrapping_sub(head);
        let count = available.min(max_len);

        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: Slots in `[head, tail)` are published by the
            // producer's Release store and not rewritten until `head`
            // passes them.
            out.push(unsafe { (*self.slots.get())[head.wrapping_add(i) & Self::MASK] });
        }

        self.head.store(head.wrapping_add(count), Ordering::Release);
        out
    }

    /// Non-blocking emptiness check for the consumer-facing read path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Relaxed) == self.tail.load(Ordering::Acquire)
    }

    /// Number of bytes currently buffered.
    #[inline]
    pub fn len(&self) -> usize {
        self.tail
            .load(Ordering::Acquire)
            .wrapping_sub(self.head.load(Ordering::Relaxed))
    }

    /// Get the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for ByteSink<N> {
    fn default() -> Self {
        Self::new()
    }
}
