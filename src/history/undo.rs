//! Reversal of the most recent mutation batch.

use crate::history::entry::{RenameRecord, UndoLog};
use crate::history::store::UndoStore;
use crate::error::Result;
use crate::mutation::perform_move;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a single record could not be reversed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// The moved file is no longer where the record says it went
    TargetMissing,
    /// Something already occupies the original path
    OriginalOccupied,
    /// The filesystem refused the move back
    MoveFailed,
}

/// Per-record reversal failure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoFailure {
    pub from_path: PathBuf,
    pub to_path: PathBuf,
    pub conflict_type: ConflictType,
    pub message: String,
}

/// Result of undo execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOutcome {
    /// Number of records reversed and removed from the log
    pub restored: usize,
    /// Number of records left in the log because reversal failed
    pub failed: usize,
    pub errors: Vec<UndoFailure>,
    /// Set when there was nothing to undo
    pub message: Option<String>,
}

/// Reverse the most recent batch, newest record first.
///
/// A record leaves the log only once its file is back at `from_path`.
/// Failures are collected per record and never stop the rest of the batch.
/// With nothing to undo this returns `restored == 0` and a message.
pub fn undo_last_batch<S: UndoStore + ?Sized>(store: &S) -> Result<UndoOutcome> {
    let mut outcome = UndoOutcome::default();

    store.update(&mut |log: &mut UndoLog| {
        outcome = reverse_current_batch(log);
    })?;

    if outcome.restored == 0 && outcome.failed == 0 {
        tracing::info!("[UndoLog] Nothing to undo");
    } else {
        tracing::info!(
            "[UndoLog] Undo finished: {} restored, {} failed",
            outcome.restored,
            outcome.failed
        );
    }

    Ok(outcome)
}

fn reverse_current_batch(log: &mut UndoLog) -> UndoOutcome {
    let mut outcome = UndoOutcome::default();

    let start = match log.last_batch_start() {
        Some(start) => start,
        None => {
            outcome.message = Some("Nothing to undo: the undo log is empty".to_string());
            return outcome;
        }
    };

    let batch: Vec<RenameRecord> = log.records.drain(start..).collect();
    let mut kept = Vec::new();

    for record in batch.into_iter().rev() {
        match reverse_record(&record) {
            Ok(()) => {
                tracing::debug!("[UndoLog] Restored {}", record.description());
                outcome.restored += 1;
            }
            Err(failure) => {
                tracing::warn!(
                    "[UndoLog] Could not restore {}: {}",
                    record.description(),
                    failure.message
                );
                outcome.failed += 1;
                outcome.errors.push(failure);
                kept.push(record);
            }
        }
    }

    // Failed records go back in their original order
    kept.reverse();
    log.records.extend(kept);
    log.refresh_marker();

    outcome
}

fn reverse_record(record: &RenameRecord) -> std::result::Result<(), UndoFailure> {
    let failure = |conflict_type: ConflictType, message: String| UndoFailure {
        from_path: record.from_path.clone(),
        to_path: record.to_path.clone(),
        conflict_type,
        message,
    };

    if !record.to_path.exists() {
        return Err(failure(
            ConflictType::TargetMissing,
            format!("{} no longer exists", record.to_path.display()),
        ));
    }

    if record.from_path.exists() {
        return Err(failure(
            ConflictType::OriginalOccupied,
            format!("{} is already occupied", record.from_path.display()),
        ));
    }

    perform_move(&record.to_path, &record.from_path)
        .map_err(|e| failure(ConflictType::MoveFailed, e.to_string()))
}
