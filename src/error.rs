//! # Error Types
//!
//! Custom error types for Efergy RX using `thiserror`.

use thiserror::Error;

/// Main error type for Efergy RX
#[derive(Debug, Error)]
pub enum EfergyRxError {
    /// GPIO line acquisition or polling errors
    #[error("GPIO error: {0}")]
    Gpio(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture log serialization errors
    #[error("Capture log error: {0}")]
    Capture(#[from] serde_json::Error),

    /// Write access requested on the read-only byte device
    #[error("write access is prohibited")]
    PermissionDenied,

    /// Another session already holds the byte device
    #[error("another session is accessing the device")]
    Busy,
}

/// Result type alias for Efergy RX
pub type Result<T> = std::result::Result<T, EfergyRxError>;
