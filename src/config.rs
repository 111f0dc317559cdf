//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub gpio: GpioConfig,

    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

/// GPIO input line configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpioConfig {
    /// Kernel GPIO number of the receiver data line
    #[serde(default = "default_gpio_pin")]
    pub pin: u64,

    /// Edge poll timeout; bounds how quickly the watcher notices shutdown
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

/// Consumer drain-loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReaderConfig {
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Maximum bytes taken from the sink per drain
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Capture log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_enabled")]
    pub enabled: bool,

    #[serde(default = "default_capture_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_gpio_pin() -> u64 { 25 }
fn default_poll_timeout_ms() -> u64 { 100 }

fn default_drain_interval_ms() -> u64 { 50 }
fn default_chunk_size() -> usize { 64 }

fn default_capture_enabled() -> bool { false }
fn default_capture_dir() -> String { "./captures".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            pin: default_gpio_pin(),
            poll_timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: default_drain_interval_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: default_capture_enabled(),
            log_dir: default_capture_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpio: GpioConfig::default(),
            reader: ReaderConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.gpio.pin > 512 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("gpio pin must be between 0 and 512")
            ));
        }

        if self.gpio.poll_timeout_ms == 0 || self.gpio.poll_timeout_ms > 10000 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("poll_timeout_ms must be between 1 and 10000")
            ));
        }

        if self.reader.drain_interval_ms == 0 || self.reader.drain_interval_ms > 60000 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("drain_interval_ms must be between 1 and 60000")
            ));
        }

        if self.reader.chunk_size == 0 || self.reader.chunk_size > 4096 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("chunk_size must be between 1 and 4096")
            ));
        }

        if self.capture.enabled && self.capture.log_dir.is_empty() {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("capture log_dir cannot be empty when enabled")
            ));
        }

        if self.capture.max_records_per_file == 0 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.capture.max_files_to_keep == 0 {
            return Err(crate::error::EfergyRxError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        Ok(())
    }
}
