//! Trait abstraction for edge-event input to enable testing

use std::time::Duration;

use sysfs_gpio::{Direction, Edge, Pin};

use crate::decoder::{EdgeClock, Level, Transition};
use crate::error::{EfergyRxError, Result};

/// Trait for blocking edge-event sources
///
/// An implementation watches one digital input line and reports each
/// transition with the level the line settled at and a monotonic timestamp
/// taken as close to the hardware event as the platform allows.
pub trait EdgeSource: Send {
    /// Wait up to `timeout` for the next transition.
    ///
    /// Returns `Ok(None)` when the timeout elapses with no edge; that is a
    /// normal outcome letting the caller re-check its shutdown flag.
    fn next_edge(&mut self, timeout: Duration) -> Result<Option<Transition>>;
}

/// Edge source backed by the sysfs GPIO interface
///
/// Exports the pin, configures it as an input with both-edge interrupts,
/// and polls the value file for transitions.
pub struct SysfsEdgeSource {
    pin: Pin,
    poller: sysfs_gpio::PinPoller,
    clock: EdgeClock,
}

impl std::fmt::Debug for SysfsEdgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysfsEdgeSource")
            .field("pin", &self.pin.get_pin_num())
            .finish_non_exhaustive()
    }
}

impl SysfsEdgeSource {
    /// Acquire the GPIO line and arm both-edge detection
    ///
    /// # Arguments
    ///
    /// * `pin_number` - Kernel GPIO number of the receiver data line
    ///
    /// # Errors
    ///
    /// Returns error if the pin cannot be exported or configured. A pin
    /// exported before a later setup step fails is unexported again before
    /// returning, so no half-acquired line is left behind.
    pub fn open(pin_number: u64) -> Result<Self> {
        let pin = Pin::new(pin_number);

        pin.export().map_err(|e| {
            EfergyRxError::Gpio(format!("Failed to export gpio {}: {}", pin_number, e))
        })?;

        match Self::configure(&pin) {
            Ok(poller) => Ok(Self {
                pin,
                poller,
                clock: EdgeClock::new(),
            }),
            Err(e) => {
                let _ = pin.unexport();
                Err(e)
            }
        }
    }

    fn configure(pin: &Pin) -> Result<sysfs_gpio::PinPoller> {
        pin.set_direction(Direction::In).map_err(|e| {
            EfergyRxError::Gpio(format!(
                "Failed to set gpio {} as input: {}",
                pin.get_pin_num(),
                e
            ))
        })?;

        pin.set_edge(Edge::BothEdges).map_err(|e| {
            EfergyRxError::Gpio(format!(
                "Failed to arm edge detection on gpio {}: {}",
                pin.get_pin_num(),
                e
            ))
        })?;

        pin.get_poller().map_err(|e| {
            EfergyRxError::Gpio(format!(
                "Failed to create poller for gpio {}: {}",
                pin.get_pin_num(),
                e
            ))
        })
    }
}

impl EdgeSource for SysfsEdgeSource {
    fn next_edge(&mut self, timeout: Duration) -> Result<Option<Transition>> {
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as isize;

        match self.poller.poll(timeout_ms).map_err(|e| {
            EfergyRxError::Gpio(format!(
                "Poll failed on gpio {}: {}",
                self.pin.get_pin_num(),
                e
            ))
        })? {
            Some(value) => Ok(Some(Transition {
                level: if value == 1 { Level::High } else { Level::Low },
                timestamp_ns: self.clock.now_ns(),
            })),
            None => Ok(None),
        }
    }
}

impl Drop for SysfsEdgeSource {
    fn drop(&mut self) {
        let _ = self.pin.unexport();
    }
}
