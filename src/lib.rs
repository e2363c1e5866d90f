//! Document text extraction and safe archive reorganization.
//!
//! - `extraction`: multi-format text extraction with OCR and converter fallbacks
//! - `ocr`: external renderer/OCR invocation under timeouts
//! - `mutation`: collision-safe rename/move recorded in the undo log
//! - `history`: persisted undo log and batch reversal
//! - `dupes`, `folders`, `scanner`, `batch`, `archive`: folder-wide operations

pub mod archive;
pub mod batch;
pub mod checksum;
pub mod config;
pub mod dupes;
pub mod error;
pub mod extraction;
pub mod folders;
pub mod history;
pub mod mutation;
pub mod ocr;
pub mod sanitize;
pub mod scanner;

pub use config::Config;
pub use error::{ArchiveError, Result};
pub use extraction::{DocumentExtractor, ExtractionMethod, ExtractionResult, SourceFormat};
pub use history::{undo_last_batch, JsonUndoStore, MemoryUndoStore, RenameRecord, UndoStore};
pub use mutation::{MoveOutcome, SafeMover};
