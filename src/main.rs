//! # Efergy RX
//!
//! Decode Efergy energy-monitor RF telemetry from GPIO edge timing.
//!
//! This application watches a GPIO line wired to the 433 MHz receiver's
//! data output, reconstructs bytes from the edge timing, and drains them
//! through an exclusive read session, optionally recording each drain to a
//! rotating JSONL capture log.

use anyhow::Result;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber;

mod capture;
mod config;
mod decoder;
mod device;
mod error;
mod gpio;
mod sink;

use capture::CaptureLog;
use config::Config;
use device::{AccessMode, Device};
use gpio::{EdgeWatcher, SysfsEdgeSource};
use sink::ByteSink;

/// Number of drain ticks between status log messages
const STATUS_INTERVAL_DRAINS: u64 = 200;

/// Main entry point for the Efergy RX daemon
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (path from the first CLI argument, defaults
///      otherwise)
///    - Acquire the GPIO line and spawn the edge watcher thread
///    - Open the exclusive read session over the byte sink
///
/// 2. **Main Loop**
///    - Drain decoded bytes from the sink on a fixed interval
///    - Append each non-empty drain to the capture log when enabled
///    - Log status periodically
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop the edge watcher (joins the thread, so no edge callback can
///      outlive the decoder or sink)
///    - Log totals and exit
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is unreadable or invalid
/// - The GPIO line cannot be acquired (anything already exported is
///   released again before the error propagates)
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Efergy RX v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let sink: Arc<ByteSink> = Arc::new(ByteSink::new());
    let source = SysfsEdgeSource::open(config.gpio.pin)?;
    info!("Watching GPIO {} for receiver edges", config.gpio.pin);

    let watcher = EdgeWatcher::spawn(
        source,
        Arc::clone(&sink),
        Duration::from_millis(config.gpio.poll_timeout_ms),
    )?;

    let device = Arc::new(Device::new(Arc::clone(&sink)));
    let mut session = device.open(AccessMode::ReadOnly)?;

    let mut capture_log = if config.capture.enabled {
        info!("Capture log enabled at {}", config.capture.log_dir);
        Some(CaptureLog::new(&config.capture)?)
    } else {
        None
    };

    let mut drain_interval = interval(Duration::from_millis(config.reader.drain_interval_ms));

    info!(
        "Draining up to {} bytes every {}ms",
        config.reader.chunk_size, config.reader.drain_interval_ms
    );
    info!("Press Ctrl+C to exit");

    let mut total_bytes: u64 = 0;
    let mut drains: u64 = 0;

    // Main drain loop
    loop {
        tokio::select! {
            _ = drain_interval.tick() => {
                let bytes = session.read(config.reader.chunk_size);
                if !bytes.is_empty() {
                    total_bytes += bytes.len() as u64;
                    debug!("Drained {} bytes: {:02X?}", bytes.len(), bytes);

                    if let Some(log) = capture_log.as_mut() {
                        if let Err(e) = log.append(&bytes) {
                            warn!("Capture log write failed: {}", e);
                        }
                    }
                }

                drains += 1;
                if drains % STATUS_INTERVAL_DRAINS == 0 {
                    info!(
                        "Decoded {} bytes so far ({} dropped on full sink)",
                        total_bytes,
                        watcher.dropped()
                    );
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Deregister the edge source before anything else goes away.
    watcher.stop();
    info!("Total decoded bytes: {}", total_bytes);

    Ok(())
}
