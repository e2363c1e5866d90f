//! Collision-safe rename/move.
//!
//! Never overwrites an existing file. Every completed move is appended to
//! the undo log handed to the `SafeMover`.

use crate::error::{ArchiveError, Result};
use crate::history::{RenameRecord, UndoStore};
use crate::sanitize::{sanitize_file_name, split_extension};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Give up after this many numeric suffixes
const MAX_SUFFIX: u32 = 10_000;

/// What a `safe_move` call ended up doing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum MoveOutcome {
    /// The file was moved; `renamed` is set when a suffix had to be added
    Moved { path: PathBuf, renamed: bool },
    /// The file already sits at the requested location
    AlreadyInPlace { path: PathBuf },
    /// An earlier identical move already happened (source gone, record found)
    AlreadyMoved { path: PathBuf },
}

impl MoveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            MoveOutcome::Moved { path, .. }
            | MoveOutcome::AlreadyInPlace { path }
            | MoveOutcome::AlreadyMoved { path } => path,
        }
    }
}

/// Performs renames/moves and records them in an undo store
pub struct SafeMover<'a, S: UndoStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: UndoStore + ?Sized> SafeMover<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Move `source` into `target_dir` under (a sanitized) `desired_name`.
    ///
    /// Creates `target_dir` if needed. If the name is taken by a different
    /// file, `_1`, `_2`, ... is appended to the stem. Re-running a move whose
    /// result already exists returns that result without a new record.
    pub fn safe_move(
        &self,
        source: &Path,
        target_dir: &Path,
        desired_name: &str,
    ) -> Result<MoveOutcome> {
        let name = sanitize_file_name(desired_name);

        if !source.exists() {
            return self.previous_result(source);
        }

        if target_dir.exists() && !target_dir.is_dir() {
            return Err(ArchiveError::NotADirectory(target_dir.to_path_buf()));
        }
        fs::create_dir_all(target_dir)
            .map_err(|e| ArchiveError::io("create directory", target_dir, e))?;

        let target = target_dir.join(&name);
        let destination = match resolve_free_path(source, &target)? {
            FreePath::IsSource(path) => {
                tracing::debug!("[SafeMove] {} already in place", path.display());
                return Ok(MoveOutcome::AlreadyInPlace { path });
            }
            FreePath::Free(path) => path,
        };

        perform_move(source, &destination)?;
        if let Err(e) = self
            .store
            .record(RenameRecord::new(source, destination.as_path()))
        {
            tracing::warn!(
                "[SafeMove] Could not record {} -> {}, moving back: {}",
                source.display(),
                destination.display(),
                e
            );
            if let Err(rollback) = perform_move(&destination, source) {
                tracing::error!(
                    "[SafeMove] Rollback failed, {} left at {}: {}",
                    source.display(),
                    destination.display(),
                    rollback
                );
            }
            return Err(e);
        }

        let renamed = destination != target;
        tracing::info!(
            "[SafeMove] {} -> {}{}",
            source.display(),
            destination.display(),
            if renamed { " (suffixed)" } else { "" }
        );

        Ok(MoveOutcome::Moved {
            path: destination,
            renamed,
        })
    }

    /// Rename a file inside its current directory
    pub fn rename_in_place(&self, source: &Path, desired_name: &str) -> Result<MoveOutcome> {
        let parent = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        self.safe_move(source, parent, desired_name)
    }

    /// Source is gone: succeed only if the log shows where it went
    fn previous_result(&self, source: &Path) -> Result<MoveOutcome> {
        let log = self.store.load()?;
        match log.latest_move_from(source) {
            Some(record) if record.to_path.exists() => {
                tracing::debug!(
                    "[SafeMove] {} was already moved to {}",
                    source.display(),
                    record.to_path.display()
                );
                Ok(MoveOutcome::AlreadyMoved {
                    path: record.to_path.clone(),
                })
            }
            _ => Err(ArchiveError::SourceNotFound(source.to_path_buf())),
        }
    }
}

enum FreePath {
    Free(PathBuf),
    IsSource(PathBuf),
}

/// Find the first candidate that is free or is the source itself
fn resolve_free_path(source: &Path, target: &Path) -> Result<FreePath> {
    if is_same_file(source, target) {
        return Ok(FreePath::IsSource(target.to_path_buf()));
    }
    if !target.exists() {
        return Ok(FreePath::Free(target.to_path_buf()));
    }

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let (stem, ext) = split_extension(&name);

    for counter in 1..=MAX_SUFFIX {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if is_same_file(source, &candidate) {
            return Ok(FreePath::IsSource(candidate));
        }
        if !candidate.exists() {
            return Ok(FreePath::Free(candidate));
        }
    }

    Err(ArchiveError::SuffixExhausted(target.to_path_buf()))
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Move a file, creating the destination's parent and falling back to
/// copy + remove across filesystems.
pub fn perform_move(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| ArchiveError::io("create directory", parent, e))?;
        }
    }

    if let Err(rename_err) = fs::rename(source, destination) {
        if source.is_dir() {
            return Err(ArchiveError::io("move directory", source, rename_err));
        }
        tracing::debug!(
            "[SafeMove] rename failed ({}), copying {}",
            rename_err,
            source.display()
        );
        fs::copy(source, destination).map_err(|e| ArchiveError::io("copy", source, e))?;
        fs::remove_file(source).map_err(|e| ArchiveError::io("remove", source, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryUndoStore;
    use tempfile::tempdir;

    #[test]
    fn test_move_into_new_directory() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("scan.pdf");
        fs::write(&source, "content").unwrap();

        let store = MemoryUndoStore::new();
        let mover = SafeMover::new(&store);
        let target_dir = dir.path().join("2023/05_Steuern");
        let outcome = mover
            .safe_move(&source, &target_dir, "2023-04-01_Steuerbescheid.pdf")
            .unwrap();

        let expected = target_dir.join("2023-04-01_Steuerbescheid.pdf");
        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                path: expected.clone(),
                renamed: false
            }
        );
        assert!(expected.exists());
        assert!(!source.exists());

        let log = store.load().unwrap();
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].from_path, source);
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        let occupied = dir.path().join("out/report.pdf");
        fs::create_dir_all(occupied.parent().unwrap()).unwrap();
        fs::write(&source, "new").unwrap();
        fs::write(&occupied, "old").unwrap();
        fs::write(dir.path().join("out/report_1.pdf"), "older").unwrap();

        let store = MemoryUndoStore::new();
        let outcome = SafeMover::new(&store)
            .safe_move(&source, &dir.path().join("out"), "report.pdf")
            .unwrap();

        assert_eq!(outcome.path(), dir.path().join("out/report_2.pdf"));
        assert_eq!(fs::read_to_string(&occupied).unwrap(), "old");
    }

    #[test]
    fn test_second_identical_call_is_noop() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("in.pdf");
        fs::write(&source, "a").unwrap();
        fs::write(dir.path().join("taken.pdf"), "b").unwrap();

        let store = MemoryUndoStore::new();
        let mover = SafeMover::new(&store);
        let first = mover.safe_move(&source, dir.path(), "taken.pdf").unwrap();
        let second = mover.safe_move(&source, dir.path(), "taken.pdf").unwrap();

        assert_eq!(first.path(), dir.path().join("taken_1.pdf"));
        assert_eq!(second, MoveOutcome::AlreadyMoved { path: first.path().to_path_buf() });
        assert!(!dir.path().join("taken_2.pdf").exists());
        assert_eq!(store.load().unwrap().records.len(), 1);
    }

    #[test]
    fn test_moving_onto_itself_is_noop() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("done.pdf");
        fs::write(&source, "a").unwrap();

        let store = MemoryUndoStore::new();
        let outcome = SafeMover::new(&store)
            .rename_in_place(&source, "done.pdf")
            .unwrap();

        assert!(matches!(outcome, MoveOutcome::AlreadyInPlace { .. }));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_suffixed_output_is_recognized_as_source() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("brief.pdf"), "other").unwrap();
        let source = dir.path().join("brief_1.pdf");
        fs::write(&source, "mine").unwrap();

        let store = MemoryUndoStore::new();
        let outcome = SafeMover::new(&store)
            .rename_in_place(&source, "brief.pdf")
            .unwrap();

        assert_eq!(outcome, MoveOutcome::AlreadyInPlace { path: source.clone() });
        assert!(source.exists());
    }

    #[test]
    fn test_missing_source_without_record() {
        let dir = tempdir().unwrap();
        let store = MemoryUndoStore::new();
        let result = SafeMover::new(&store).safe_move(
            &dir.path().join("nope.pdf"),
            dir.path(),
            "x.pdf",
        );
        assert!(matches!(result, Err(ArchiveError::SourceNotFound(_))));
    }

    #[test]
    fn test_name_is_sanitized() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, "a").unwrap();

        let store = MemoryUndoStore::new();
        let outcome = SafeMover::new(&store)
            .safe_move(&source, dir.path(), "Q1/Q2: Bericht?.txt")
            .unwrap();
        assert_eq!(outcome.path(), dir.path().join("Q1Q2 Bericht.txt"));
    }

    struct ReadOnlyStore;

    impl UndoStore for ReadOnlyStore {
        fn load(&self) -> Result<crate::history::UndoLog> {
            Ok(crate::history::UndoLog::new())
        }

        fn update(&self, _f: &mut dyn FnMut(&mut crate::history::UndoLog)) -> Result<()> {
            Err(ArchiveError::LockPoisoned)
        }
    }

    #[test]
    fn test_unrecorded_move_is_rolled_back() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("brief.pdf");
        fs::write(&source, "inhalt").unwrap();
        let target_dir = dir.path().join("archiv");

        let result = SafeMover::new(&ReadOnlyStore).safe_move(&source, &target_dir, "brief.pdf");

        assert!(matches!(result, Err(ArchiveError::LockPoisoned)));
        assert_eq!(fs::read_to_string(&source).unwrap(), "inhalt");
        assert!(!target_dir.join("brief.pdf").exists());
    }
}
