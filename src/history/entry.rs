//! Data structures for the undo log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema version for forward compatibility
pub const UNDO_LOG_SCHEMA_VERSION: u32 = 1;

/// Default gap separating two undo batches
pub const DEFAULT_BATCH_GAP_SECS: i64 = 5;

/// One completed rename/move. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenameRecord {
    pub timestamp: DateTime<Utc>,
    pub from_path: PathBuf,
    pub to_path: PathBuf,
}

impl RenameRecord {
    pub fn new(from_path: impl Into<PathBuf>, to_path: impl Into<PathBuf>) -> Self {
        Self::at(Utc::now(), from_path, to_path)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        from_path: impl Into<PathBuf>,
        to_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            timestamp,
            from_path: from_path.into(),
            to_path: to_path.into(),
        }
    }

    /// Get a human-readable description of the record
    pub fn description(&self) -> String {
        format!(
            "{} → {}",
            self.from_path.display(),
            self.to_path.display()
        )
    }
}

/// The persisted log: mutation records in recording order.
///
/// `last_batch` is the timestamp of the first record of the most recent
/// contiguous run; batches themselves are never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoLog {
    pub version: u32,
    pub last_batch: Option<DateTime<Utc>>,
    pub records: Vec<RenameRecord>,
    #[serde(skip, default = "default_gap")]
    gap: Duration,
}

fn default_gap() -> Duration {
    Duration::seconds(DEFAULT_BATCH_GAP_SECS)
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoLog {
    pub fn new() -> Self {
        Self {
            version: UNDO_LOG_SCHEMA_VERSION,
            last_batch: None,
            records: Vec::new(),
            gap: default_gap(),
        }
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    pub fn set_gap(&mut self, gap: Duration) {
        self.gap = gap;
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record, opening a new batch when the gap is exceeded
    pub fn push(&mut self, record: RenameRecord) {
        let starts_batch = match self.records.last() {
            Some(prev) => record.timestamp - prev.timestamp > self.gap,
            None => true,
        };

        if starts_batch || self.last_batch.is_none() {
            self.last_batch = Some(record.timestamp);
        }

        self.records.push(record);
    }

    /// Index of the first record belonging to the most recent batch
    pub fn last_batch_start(&self) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }

        let start = self.contiguous_run_start(self.records.len());
        if self.last_batch != Some(self.records[start].timestamp) {
            tracing::debug!("[UndoLog] Batch marker out of date, using recomputed run start");
        }
        Some(start)
    }

    /// Records of the most recent batch, in recording order
    pub fn current_batch(&self) -> &[RenameRecord] {
        match self.last_batch_start() {
            Some(start) => &self.records[start..],
            None => &[],
        }
    }

    /// Walk back from `end` while consecutive records stay within the gap
    fn contiguous_run_start(&self, end: usize) -> usize {
        let mut start = end.saturating_sub(1);
        while start > 0 {
            let prev = &self.records[start - 1];
            let curr = &self.records[start];
            if curr.timestamp - prev.timestamp > self.gap {
                break;
            }
            start -= 1;
        }
        start
    }

    /// Recompute the batch marker after records were removed
    pub fn refresh_marker(&mut self) {
        self.last_batch = if self.records.is_empty() {
            None
        } else {
            let start = self.contiguous_run_start(self.records.len());
            Some(self.records[start].timestamp)
        };
    }

    /// Most recent record that moved `source` away
    pub fn latest_move_from(&self, source: &Path) -> Option<&RenameRecord> {
        self.records.iter().rev().find(|r| r.from_path == source)
    }
}

/// Summary of the undo log for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoLogSummary {
    pub total_records: usize,
    pub last_batch_size: usize,
    pub last_batch_started: Option<DateTime<Utc>>,
}

impl From<&UndoLog> for UndoLogSummary {
    fn from(log: &UndoLog) -> Self {
        Self {
            total_records: log.records.len(),
            last_batch_size: log.current_batch().len(),
            last_batch_started: log.current_batch().first().map(|r| r.timestamp),
        }
    }
}
