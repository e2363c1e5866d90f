//! Typo-tolerant folder discovery.
//!
//! Walks a directory tree (bounded depth, symlinks never followed) and ranks
//! directory names against a query by Levenshtein distance.

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default walk depth below the root
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Names within this edit distance count as matches
const MAX_DISTANCE: usize = 3;

/// Number of suggestions returned
const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderMatch {
    pub path: PathBuf,
    /// 0 means an exact (case-insensitive) name match
    pub edit_distance: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSearch {
    pub best: Option<FolderMatch>,
    pub suggestions: Vec<FolderMatch>,
    pub directories_scanned: usize,
}

/// Find folders below `root` whose names resemble `query`.
///
/// A directory matches when its lowercase name is within `MAX_DISTANCE`
/// edits of the lowercase query, or when either contains the other.
/// Hidden directories are skipped along with everything beneath them.
pub fn find_folder(query: &str, root: &Path, max_depth: usize) -> FolderSearch {
    let query = query.trim().to_lowercase();
    let mut search = FolderSearch::default();
    if query.is_empty() {
        return search;
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e.file_name()));

    let mut matches = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[Folders] Walk error: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        search.directories_scanned += 1;

        let name = entry.file_name().to_string_lossy().to_lowercase();
        let distance = if name == query {
            0
        } else {
            levenshtein(&query, &name)
        };

        if distance <= MAX_DISTANCE || name.contains(&query) || query.contains(&name) {
            matches.push(FolderMatch {
                path: entry.into_path(),
                edit_distance: distance,
            });
        }
    }

    matches.sort_by(|a, b| {
        a.edit_distance
            .cmp(&b.edit_distance)
            .then_with(|| a.path.components().count().cmp(&b.path.components().count()))
            .then_with(|| a.path.cmp(&b.path))
    });
    matches.truncate(MAX_SUGGESTIONS);

    search.best = matches.first().cloned();
    search.suggestions = matches;

    tracing::debug!(
        "[Folders] '{}' under {}: {} dirs scanned, best {:?}",
        query,
        root.display(),
        search.directories_scanned,
        search.best.as_ref().map(|m| m.path.display().to_string())
    );

    search
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

/// Levenshtein edit distance over Unicode scalar values
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
