//! Duplicate detection by full-content hash.
//!
//! Computed fresh on every call. Groups are reported, never resolved:
//! deciding which copy to keep is the caller's job.

use crate::checksum::{compute_file_digest, ContentHash};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Two or more paths with identical content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub hash: ContentHash,
    pub size: u64,
    pub paths: Vec<PathBuf>,
}

/// A file that could not be hashed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub files_hashed: usize,
    pub groups: Vec<DuplicateGroup>,
    pub errors: Vec<HashFailure>,
}

impl DuplicateReport {
    /// Bytes that would be reclaimed by keeping one copy per group
    pub fn wasted_bytes(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| g.size * (g.paths.len() as u64 - 1))
            .sum()
    }
}

/// Group the given files by content hash.
///
/// Unreadable files are reported in `errors` and otherwise ignored.
/// Paths keep their input order inside a group; groups are ordered by
/// their first member's position in the input.
pub fn find_duplicates<P: AsRef<Path>>(paths: &[P]) -> DuplicateReport {
    let mut report = DuplicateReport::default();
    let mut by_hash: HashMap<ContentHash, usize> = HashMap::new();
    let mut buckets: Vec<DuplicateGroup> = Vec::new();

    for path in paths {
        let path = path.as_ref();
        match compute_file_digest(path) {
            Ok(digest) => {
                report.files_hashed += 1;
                match by_hash.get(&digest.hash) {
                    Some(&idx) => buckets[idx].paths.push(digest.path),
                    None => {
                        by_hash.insert(digest.hash, buckets.len());
                        buckets.push(DuplicateGroup {
                            hash: digest.hash,
                            size: digest.size,
                            paths: vec![digest.path],
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!("[Dupes] Failed to hash {}: {}", path.display(), e);
                report.errors.push(HashFailure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    report.groups = buckets.into_iter().filter(|g| g.paths.len() >= 2).collect();

    tracing::info!(
        "[Dupes] Hashed {} files, {} duplicate groups, {} errors",
        report.files_hashed,
        report.groups.len(),
        report.errors.len()
    );

    report
}

/// Collect every regular file below `root` (symlinks are not followed)
pub fn collect_files(root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identical_content_grouped_regardless_of_name() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("scan_0001.pdf");
        let b = dir.path().join("sub").join("2023-01-05_Rechnung.pdf");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        let report = find_duplicates(&[&a, &b]);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].paths, vec![a, b]);
        assert_eq!(report.wasted_bytes(), 10);
    }

    #[test]
    fn test_single_byte_difference_not_grouped() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"content-1").unwrap();
        fs::write(&b, b"content-2").unwrap();

        let report = find_duplicates(&[&a, &b]);
        assert!(report.groups.is_empty());
        assert_eq!(report.files_hashed, 2);
    }

    #[test]
    fn test_unreadable_files_reported() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, b"x").unwrap();

        let report = find_duplicates(&[a.clone(), dir.path().join("missing.txt")]);
        assert_eq!(report.files_hashed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.groups.is_empty());
    }

    #[test]
    fn test_collect_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("x/y")).unwrap();
        fs::write(dir.path().join("top.txt"), b"1").unwrap();
        fs::write(dir.path().join("x/y/deep.txt"), b"2").unwrap();

        assert_eq!(collect_files(dir.path(), None).len(), 2);
        assert_eq!(collect_files(dir.path(), Some(1)).len(), 1);
    }
}
