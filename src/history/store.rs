//! Persistence for the undo log.
//!
//! The store is an explicit handle passed to whoever mutates files; there
//! is no process-wide singleton. `JsonUndoStore` keeps the log in a single
//! JSON file, `MemoryUndoStore` keeps it in memory for tests and dry runs.

use crate::error::{ArchiveError, Result};
use crate::history::entry::{RenameRecord, UndoLog, DEFAULT_BATCH_GAP_SECS};
use chrono::Duration;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage backend for the undo log.
///
/// `update` is the unit of atomicity: load, mutate, write back, with no
/// other writer interleaving.
pub trait UndoStore {
    /// Read the current log
    fn load(&self) -> Result<UndoLog>;

    /// Run `f` against the log and persist the result
    fn update(&self, f: &mut dyn FnMut(&mut UndoLog)) -> Result<()>;

    /// Append one record
    fn record(&self, record: RenameRecord) -> Result<()> {
        let mut pending = Some(record);
        self.update(&mut |log| {
            if let Some(record) = pending.take() {
                tracing::debug!("[UndoLog] Recorded {}", record.description());
                log.push(record);
            }
        })
    }
}

/// Undo log persisted as one JSON document.
///
/// Writes go to a temp file which is synced and renamed over the log;
/// an exclusive advisory lock on a sibling `.lock` file is held for the
/// whole read-modify-write cycle.
pub struct JsonUndoStore {
    path: PathBuf,
    gap: Duration,
}

impl JsonUndoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gap: Duration::seconds(DEFAULT_BATCH_GAP_SECS),
        }
    }

    /// Override the batch gap (records within it form one undo batch)
    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("tmp")
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| ArchiveError::io("create directory", parent, e))?;
            }
        }
        Ok(())
    }

    /// Acquire an exclusive lock for the log.
    /// Returns a File handle that must be kept alive while holding the lock.
    fn acquire_lock(&self) -> Result<File> {
        self.ensure_parent()?;

        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ArchiveError::io("open lock file", &lock_path, e))?;

        lock_file
            .lock_exclusive()
            .map_err(|e| ArchiveError::io("lock", &lock_path, e))?;

        Ok(lock_file)
    }

    fn read_log(&self) -> Result<UndoLog> {
        if !self.path.exists() {
            return Ok(UndoLog::new().with_gap(self.gap));
        }

        let file = File::open(&self.path).map_err(|e| ArchiveError::io("open", &self.path, e))?;
        let mut log: UndoLog = serde_json::from_reader(BufReader::new(file))?;
        log.set_gap(self.gap);
        Ok(log)
    }

    /// Atomically write the log to disk
    fn write_log(&self, log: &UndoLog) -> Result<()> {
        let temp_path = self.temp_path();

        let file =
            File::create(&temp_path).map_err(|e| ArchiveError::io("create", &temp_path, e))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, log)?;

        writer
            .flush()
            .map_err(|e| ArchiveError::io("flush", &temp_path, e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| ArchiveError::io("sync", &temp_path, e))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ArchiveError::io("replace", &self.path, e))?;

        Ok(())
    }
}

impl UndoStore for JsonUndoStore {
    fn load(&self) -> Result<UndoLog> {
        let _lock = self.acquire_lock()?;
        self.read_log()
    }

    fn update(&self, f: &mut dyn FnMut(&mut UndoLog)) -> Result<()> {
        let lock = self.acquire_lock()?;

        let mut log = self.read_log()?;
        f(&mut log);
        self.write_log(&log)?;

        if let Err(e) = lock.unlock() {
            tracing::warn!("[UndoLog] Failed to release lock: {}", e);
        }

        tracing::debug!(
            "[UndoLog] Saved {} records to {}",
            log.records.len(),
            self.path.display()
        );

        Ok(())
    }
}

/// In-memory undo log
#[derive(Default)]
pub struct MemoryUndoStore {
    log: Mutex<UndoLog>,
}

impl MemoryUndoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gap(gap: Duration) -> Self {
        Self {
            log: Mutex::new(UndoLog::new().with_gap(gap)),
        }
    }
}

impl UndoStore for MemoryUndoStore {
    fn load(&self) -> Result<UndoLog> {
        self.log
            .lock()
            .map(|log| log.clone())
            .map_err(|_| ArchiveError::LockPoisoned)
    }

    fn update(&self, f: &mut dyn FnMut(&mut UndoLog)) -> Result<()> {
        let mut log = self.log.lock().map_err(|_| ArchiveError::LockPoisoned)?;
        f(&mut *log);
        Ok(())
    }
}
