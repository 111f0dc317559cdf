//! # Byte Device Module
//!
//! Consumer-facing read access to the decoded byte stream.
//!
//! The device generalizes a read-only character-device node: opening with
//! write intent is refused, at most one session is active at a time, and
//! reads never block. Whatever presents this as an actual file (or socket,
//! or anything else) sits above this module.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{EfergyRxError, Result};
use crate::sink::{ByteSink, DEFAULT_SINK_CAPACITY};

/// Requested access mode for a device session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Whether this mode includes write intent
    fn writes(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// Exclusive-open handle over the byte sink
///
/// One `Device` fronts one sink for the lifetime of the subsystem. Sessions
/// come and go; the device only tracks whether one is currently active.
pub struct Device<const N: usize = DEFAULT_SINK_CAPACITY> {
    sink: Arc<ByteSink<N>>,
    busy: AtomicBool,
}

impl<const N: usize> std::fmt::Debug for Device<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}

impl<const N: usize> Device<N> {
    /// Create a device over a shared sink.
    pub fn new(sink: Arc<ByteSink<N>>) -> Self {
        Self {
            sink,
            busy: AtomicBool::new(false),
        }
    }

    /// Open a session.
    ///
    /// # Errors
    ///
    /// * [`EfergyRxError::PermissionDenied`] - `mode` carries write intent;
    ///   the device is read-only
    /// * [`EfergyRxError::Busy`] - another session is already open; the
    ///   attempt fails immediately rather than queuing
    pub fn open(self: &Arc<Self>, mode: AccessMode) -> Result<Session<N>> {
        if mode.writes() {
            warn!("write access is prohibited");
            return Err(EfergyRxError::PermissionDenied);
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("another session is accessing the device");
            return Err(EfergyRxError::Busy);
        }

        debug!("read session opened");
        Ok(Session {
            device: Arc::clone(self),
        })
    }
}

/// An open read session
///
/// Dropping the session releases exclusivity, allowing a new open.
pub struct Session<const N: usize = DEFAULT_SINK_CAPACITY> {
    device: Arc<Device<N>>,
}

impl<const N: usize> std::fmt::Debug for Session<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl<const N: usize> Session<N> {
    /// Remove and return up to `max_len` buffered bytes, FIFO order.
    ///
    /// Returns an empty vector immediately when nothing is buffered.
    pub fn read(&mut self, max_len: usize) -> Vec<u8> {
        if self.device.sink.is_empty() {
            return Vec::new();
        }
        self.device.sink.read(max_len)
    }
}

impl<const N: usize> Drop for Session<N> {
    fn drop(&mut self) {
        self.device.busy.store(false, Ordering::Release);
        debug!("read session closed");
    }
}
