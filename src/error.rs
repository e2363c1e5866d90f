//! Error types shared by the mutation, undo and hashing layers.
//!
//! Extraction never surfaces these: it folds every failure into the
//! warnings of an `ExtractionResult` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for filesystem mutations and undo log persistence
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No free name left for {}", .0.display())]
    SuffixExhausted(PathBuf),

    #[error("Failed to serialize undo log: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Undo log lock poisoned")]
    LockPoisoned,
}

impl ArchiveError {
    /// Build an I/O error tagged with the action and path involved
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<ArchiveError> for String {
    fn from(err: ArchiveError) -> Self {
        err.to_string()
    }
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
