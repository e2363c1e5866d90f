//! Discovery of files that still need archiving.
//!
//! A file counts as formatted once its name starts with an ISO date
//! prefix (`2024-03-01_...`); everything else with a supported extension
//! is a candidate.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default number of directory levels below the root that are searched
pub const DEFAULT_SCAN_DEPTH: usize = 3;

/// Extensions picked up when the caller does not pass its own list
pub const DEFAULT_SCAN_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "pages", "rtf", "odt", "txt", "jpg", "jpeg", "png", "tif", "tiff",
];

static FORMATTED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}_").expect("Invalid regex"));

/// Whether a file name already carries the archive date prefix
pub fn is_formatted_name(name: &str) -> bool {
    FORMATTED_NAME.is_match(name)
}

/// Files under `root` without a date prefix, in file-name order.
///
/// Files directly in `root` are level 0; subdirectories are entered down
/// to `max_depth`. Hidden entries are skipped along with their contents
/// and symlinks are never followed.
pub fn find_unformatted_files(root: &Path, max_depth: usize, extensions: &[&str]) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth + 1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[Scanner] Walk error: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let has_extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !has_extension {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if is_formatted_name(&name) {
            continue;
        }
        files.push(entry.into_path());
    }

    tracing::info!(
        "[Scanner] {} unformatted file(s) under {}",
        files.len(),
        root.display()
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_formatted_name() {
        assert!(is_formatted_name("2023-04-01_Steuerbescheid.pdf"));
        assert!(!is_formatted_name("Steuerbescheid 2023-04-01.pdf"));
        assert!(!is_formatted_name("2023-4-1_x.pdf"));
    }

    #[test]
    fn test_finds_unformatted_in_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b_scan.pdf");
        touch(dir.path(), "a_brief.DOCX");
        touch(dir.path(), "2023-01-01_done.pdf");
        touch(dir.path(), "notes.xyz");
        touch(dir.path(), ".hidden.pdf");
        touch(dir.path(), ".cache/inner.pdf");
        touch(dir.path(), "sub/c.txt");

        let files = find_unformatted_files(dir.path(), DEFAULT_SCAN_DEPTH, DEFAULT_SCAN_EXTENSIONS);
        assert_eq!(
            names(&files, dir.path()),
            vec!["a_brief.DOCX", "b_scan.pdf", "sub/c.txt"]
        );
    }

    #[test]
    fn test_depth_limit() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "l1/l2/l3/deep.pdf");
        touch(dir.path(), "l1/l2/l3/l4/too_deep.pdf");

        let files = find_unformatted_files(dir.path(), 3, &["pdf"]);
        assert_eq!(names(&files, dir.path()), vec!["l1/l2/l3/deep.pdf"]);
    }
}
