//! # Capture Log Module
//!
//! Handles capture logging of drained bytes to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting drained byte chunks as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files
//!
//! Capture runs entirely on the consumer side of the sink; the edge watcher
//! never touches it.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::config::CaptureConfig;
use crate::error::Result;

/// One captured drain, as serialized to a JSONL line
#[derive(Debug, Serialize)]
struct CaptureRecord {
    /// RFC 3339 wall-clock time of the drain
    timestamp: String,

    /// Drained bytes as uppercase hex
    hex: String,

    /// Number of bytes in this drain
    count: usize,
}

/// Rotating JSONL writer for decoded-byte captures
#[derive(Debug)]
pub struct CaptureLog {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    file: Option<File>,
    records_in_file: usize,
    files_created: u64,
}

impl CaptureLog {
    /// Create a capture log rooted at the configured directory.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            file: None,
            records_in_file: 0,
            files_created: 0,
        })
    }

    /// Append one drained chunk as a JSONL record.
    ///
    /// Empty chunks are ignored. Opens the first file lazily and rotates
    /// when the current file reaches its record limit.
    ///
    /// # Errors
    ///
    /// Returns error if rotation or the write fails.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let record = CaptureRecord {
            timestamp: Utc::now().to_rfc3339(),
            hex: bytes.iter().map(|b| format!("{:02X}", b)).collect(),
            count: bytes.len(),
        };
        let line = serde_json::to_string(&record)?;

        if self.file.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", line)?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Open a fresh capture file and prune the oldest beyond the limit.
    fn rotate(&mut self) -> Result<()> {
        // Sequence suffix keeps names unique within one second.
        self.files_created += 1;
        let name = format!(
            "capture-{}-{:04}.jsonl",
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.files_created
        );

        self.file = Some(File::create(self.dir.join(name))?);
        self.records_in_file = 0;

        self.prune()?;
        Ok(())
    }

    /// Remove the oldest capture files until at most `max_files_to_keep`
    /// remain.
    fn prune(&self) -> Result<()> {
        let mut captures: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with("capture-") && name.ends_with(".jsonl"))
                    .unwrap_or(false)
            })
            .collect();

        // Timestamped names sort oldest-first.
        captures.sort();

        while captures.len() > self.max_files_to_keep {
            let oldest = captures.remove(0);
            fs::remove_file(oldest)?;
        }

        Ok(())
    }
}
