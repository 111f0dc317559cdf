//! # GPIO Edge Input Module
//!
//! Drives the bit decoder from line transitions.
//!
//! This module handles:
//! - The `EdgeSource` seam over the platform's edge-notification mechanism
//! - The sysfs GPIO implementation of that seam
//! - The dedicated watcher thread that owns the decoder state and feeds
//!   completed bytes into the shared sink

pub mod source;

pub use source::{EdgeSource, SysfsEdgeSource};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::decoder::BitDecoder;
use crate::error::Result;
use crate::sink::ByteSink;

/// Dedicated edge-processing thread.
///
/// Owns the [`BitDecoder`] for its whole life, so every `on_edge` call is
/// serialized on this one thread and the decoder state is never shared.
/// Completed bytes go into the sink synchronously, within the same loop
/// iteration that observed the closing edge.
///
/// Teardown order matters: [`stop`](EdgeWatcher::stop) (or drop) joins the
/// thread first, guaranteeing no edge callback runs against released
/// resources.
pub struct EdgeWatcher {
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl EdgeWatcher {
    /// Spawn the watcher thread over an edge source.
    ///
    /// # Arguments
    ///
    /// * `source` - Edge-event input, polled with `poll_timeout`
    /// * `sink` - Shared byte sink receiving completed bytes
    /// * `poll_timeout` - Upper bound on how long a poll may block; bounds
    ///   shutdown latency, not edge latency
    ///
    /// # Errors
    ///
    /// Returns error if the OS refuses to spawn the thread.
    pub fn spawn<S, const N: usize>(
        mut source: S,
        sink: Arc<ByteSink<N>>,
        poll_timeout: Duration,
    ) -> Result<Self>
    where
        S: EdgeSource + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let thread_stop = Arc::clone(&stop);
        let thread_dropped = Arc::clone(&dropped);

        let handle = std::thread::Builder::new()
            .name("efergy-edge".to_string())
            .spawn(move || {
                let mut decoder = BitDecoder::new();

                while !thread_stop.load(Ordering::Relaxed) {
                    match source.next_edge(poll_timeout) {
                        Ok(Some(transition)) => {
                            if let Some(byte) = decoder.on_edge(transition) {
                                if !sink.push(byte) {
                                    thread_dropped.fetch_add(1, Ordering::Relaxed);
                                    trace!("sink full, dropped byte 0x{:02X}", byte);
                                }
                            }
                        }
                        Ok(None) => {
                            // Idle line or poll timeout; loop to re-check
                            // the stop flag.
                        }
                        Err(e) => {
                            warn!("Edge poll failed, stopping watcher: {}", e);
                            break;
                        }
                    }
                }

                debug!("Edge watcher thread exiting");
            })?;

        Ok(Self {
            stop,
            dropped,
            handle: Some(handle),
        })
    }

    /// Count of decoded bytes dropped because the sink was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Whether the watcher thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop edge delivery and wait for the thread to finish.
    ///
    /// After this returns, no further decoder or sink access happens from
    /// the producer side.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EdgeWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{Level, Transition};
    use crate::gpio::source::mocks::MockEdgeSource;
    use std::time::Instant;

    const POLL_TIMEOUT: Duration = Duration::from_millis(5);

    /// Transitions for a run of 200 µs bit cells, preceded by a
    /// synchronizing falling edge.
    fn transitions_for_bits(start_ns: u64, bits: &[u8]) -> Vec<Transition> {
        let mut events = vec![Transition {
            level: Level::Low,
            timestamp_ns: start_ns,
        }];

        let mut cell_start = start_ns;
        for &bit in bits {
            let rise = cell_start + if bit != 0 { 50_000 } else { 150_000 };
            let fall = cell_start + 200_000;
            events.push(Transition { level: Level::High, timestamp_ns: rise });
            events.push(Transition { level: Level::Low, timestamp_ns: fall });
            cell_start = fall;
        }

        events
    }

    fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !condition() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_watcher_decodes_byte_into_sink() {
        let events = transitions_for_bits(300_000, &[1, 0, 1, 1, 0, 0, 1, 0]);
        let source = MockEdgeSource::new(events);
        let sink = Arc::new(ByteSink::<128>::new());

        let watcher = EdgeWatcher::spawn(source, Arc::clone(&sink), POLL_TIMEOUT).unwrap();

        wait_for(|| !sink.is_empty());
        assert_eq!(sink.read(16), vec![0xB2]);
        assert_eq!(watcher.dropped(), 0);

        watcher.stop();
    }

    #[test]
    fn test_watcher_counts_sink_full_drops() {
        // Six full bytes into a four-byte sink with no consumer.
        let bits: Vec<u8> = std::iter::repeat([1, 0, 1, 1, 0, 0, 1, 0])
            .take(6)
            .flatten()
            .collect();
        let source = MockEdgeSource::new(transitions_for_bits(300_000, &bits));
        let script = source.clone();
        let sink = Arc::new(ByteSink::<4>::new());

        let watcher = EdgeWatcher::spawn(source, Arc::clone(&sink), POLL_TIMEOUT).unwrap();

        wait_for(|| script.remaining() == 0 && watcher.dropped() == 2);
        assert_eq!(watcher.dropped(), 2);
        assert_eq!(sink.read(16), vec![0xB2; 4]);

        watcher.stop();
    }

    #[test]
    fn test_stop_joins_the_thread() {
        let source = MockEdgeSource::new(Vec::new());
        let sink = Arc::new(ByteSink::<128>::new());

        let watcher = EdgeWatcher::spawn(source, sink, POLL_TIMEOUT).unwrap();
        assert!(watcher.is_running());

        // Consumes and joins; returning at all proves the thread exited.
        watcher.stop();
    }

    #[test]
    fn test_drop_also_stops_the_thread() {
        let source = MockEdgeSource::new(Vec::new());
        let sink = Arc::new(ByteSink::<128>::new());

        let watcher = EdgeWatcher::spawn(source, sink, POLL_TIMEOUT).unwrap();
        drop(watcher);
    }

    #[test]
    fn test_watcher_exits_on_poll_error() {
        let source = MockEdgeSource::new(Vec::new());
        source.set_poll_error("line went away");
        let sink = Arc::new(ByteSink::<128>::new());

        let watcher = EdgeWatcher::spawn(source, sink, POLL_TIMEOUT).unwrap();

        wait_for(|| !watcher.is_running());
        assert!(!watcher.is_running());
    }
}
