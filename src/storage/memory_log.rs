//! Bounded, persisted sample history.
//!
//! A memory log keeps the most recent `max_size` samples a subnet has been
//! shown, in insertion order, each stamped with its insertion time. When a
//! storage path is configured the full sequence is written as a JSON array
//! after every append (auto-persist) or on demand.
//!
//! # File format
//!
//! ```json
//! [
//!   {"src": "心梗", "tgt": "myocardial infarction", "timestamp": "2024-05-01T08:00:00Z"},
//!   {"src": "患者", "tgt": "patient", "context": "ward", "timestamp": "2024-05-01T08:00:01Z"}
//! ]
//! ```

use super::temp_path;
use crate::models::{MemorySample, StoredSample};
use crate::observability::metrics as names;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum memory file size accepted on restore (64MB).
const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Bounded FIFO of timestamped samples with optional file persistence.
#[derive(Debug, Clone)]
pub struct MemoryLog {
    max_size: usize,
    path: Option<PathBuf>,
    auto_persist: bool,
    entries: VecDeque<StoredSample>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryLog {
    /// Default capacity.
    pub const DEFAULT_MAX_SIZE: usize = 1000;

    /// Creates an empty, in-memory log.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            path: None,
            auto_persist: true,
            entries: VecDeque::new(),
            last_timestamp: None,
        }
    }

    /// Opens a file-backed log, restoring any previously persisted samples.
    ///
    /// A missing file is a first run and yields an empty log.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>, max_size: usize, auto_persist: bool) -> Result<Self> {
        let mut log = Self::new(max_size)
            .with_path(path)
            .with_auto_persist(auto_persist);
        log.restore()?;
        Ok(log)
    }

    /// Sets the storage location without touching the filesystem.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Enables or disables persisting after every append.
    #[must_use]
    pub const fn with_auto_persist(mut self, auto_persist: bool) -> Self {
        self.auto_persist = auto_persist;
        self
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the storage location, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no samples are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends samples in order, stamping each with the current time, then
    /// evicts the oldest entries until the log fits its capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if auto-persist is enabled and writing fails. The
    /// in-memory append has already happened at that point.
    pub fn append(&mut self, samples: &[MemorySample]) -> Result<()> {
        for sample in samples {
            let timestamp = self.next_timestamp();
            self.entries.push_back(StoredSample {
                sample: sample.clone(),
                timestamp,
            });
        }
        let evicted = self.evict();

        metrics::counter!(names::MEMORY_SAMPLES_APPENDED_TOTAL).increment(samples.len() as u64);
        tracing::debug!(
            appended = samples.len(),
            evicted,
            len = self.entries.len(),
            max_size = self.max_size,
            "Appended samples to memory log"
        );

        if self.auto_persist && self.path.is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Returns the last `min(n, len)` samples in insertion order.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<MemorySample> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries
            .iter()
            .skip(skip)
            .map(|stored| stored.sample.clone())
            .collect()
    }

    /// Finds the most recent sample whose source text equals `source`.
    #[must_use]
    pub fn lookup(&self, source: &str) -> Option<&MemorySample> {
        self.entries
            .iter()
            .rev()
            .map(|stored| &stored.sample)
            .find(|sample| sample.source == source)
    }

    /// Writes the full ordered sequence to the storage location.
    ///
    /// The file is replaced atomically via a sibling temp file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoStorageTarget`] if no location is configured, or an
    /// error if serialization or I/O fails.
    pub fn persist(&self) -> Result<()> {
        let path = self.path.as_deref().ok_or(Error::NoStorageTarget)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::failed("create_memory_dir", e))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| Error::failed("serialize_memory_log", e))?;

        let tmp = temp_path(path);
        fs::write(&tmp, json).map_err(|e| Error::OperationFailed {
            operation: "write_memory_log".to_string(),
            cause: format!("{}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, path).map_err(|e| Error::OperationFailed {
            operation: "replace_memory_log".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        metrics::counter!(names::MEMORY_PERSIST_TOTAL).increment(1);
        tracing::debug!(path = %path.display(), len = self.entries.len(), "Persisted memory log");
        Ok(())
    }

    /// Replaces the in-memory sequence with the persisted one.
    ///
    /// No-op when no location is configured or the file does not exist yet.
    /// A file holding more than `max_size` samples keeps its newest ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn restore(&mut self) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path).map_err(|e| Error::failed("read_memory_metadata", e))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "memory file exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_memory_log".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        let entries: VecDeque<StoredSample> =
            serde_json::from_str(&contents).map_err(|e| Error::OperationFailed {
                operation: "parse_memory_log".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        tracing::debug!(path = %path.display(), len = entries.len(), "Restored memory log");

        self.last_timestamp = entries.iter().map(|stored| stored.timestamp).max();
        self.entries = entries;
        self.evict();
        Ok(())
    }

    /// Wall-clock time, clamped so timestamps never decrease within this log.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamped = self.last_timestamp.map_or(now, |last| last.max(now));
        self.last_timestamp = Some(stamped);
        stamped
    }

    /// Drops entries from the head until the log fits; returns how many went.
    fn evict(&mut self) -> usize {
        let excess = self.entries.len().saturating_sub(self.max_size);
        self.entries.drain(..excess);
        excess
    }

    #[cfg(test)]
    fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.entries.iter().map(|stored| stored.timestamp).collect()
    }
}
