//! Archive skeleton: category folders under each year directory.

use serde::Serialize;
use std::ops::AddAssign;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Created (or, in a dry run, would be created)
    pub created: usize,
    pub existing: usize,
    /// Could not be created
    pub skipped: usize,
}

impl AddAssign for CategoryStats {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.existing += other.existing;
        self.skipped += other.skipped;
    }
}

/// Ensure every category folder exists under `year_dir`.
///
/// The year directory itself is never created: if it is missing the call
/// logs a warning and returns all-zero stats. A dry run only counts.
pub fn create_category_folders<S: AsRef<str>>(
    year_dir: &Path,
    categories: &[S],
    dry_run: bool,
) -> CategoryStats {
    let mut stats = CategoryStats::default();

    if !year_dir.is_dir() {
        tracing::warn!("[Folders] Year directory does not exist: {}", year_dir.display());
        return stats;
    }

    for category in categories {
        let category = category.as_ref();
        let path = year_dir.join(category);

        if path.exists() {
            tracing::debug!("[Folders] {} already exists", path.display());
            stats.existing += 1;
            continue;
        }

        if dry_run {
            tracing::info!("[Folders] Would create {}", path.display());
            stats.created += 1;
            continue;
        }

        match std::fs::create_dir_all(&path) {
            Ok(()) => {
                tracing::info!("[Folders] Created {}", path.display());
                stats.created += 1;
            }
            Err(e) => {
                tracing::warn!("[Folders] Failed to create {}: {}", path.display(), e);
                stats.skipped += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CATEGORIES: &[&str] = &["01_Finanzen", "05_Steuern", "09_Auto"];

    #[test]
    fn test_creates_missing_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("05_Steuern")).unwrap();

        let stats = create_category_folders(dir.path(), CATEGORIES, false);
        assert_eq!(
            stats,
            CategoryStats {
                created: 2,
                existing: 1,
                skipped: 0
            }
        );
        assert!(dir.path().join("09_Auto").is_dir());

        let again = create_category_folders(dir.path(), CATEGORIES, false);
        assert_eq!(again.existing, 3);
        assert_eq!(again.created, 0);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let stats = create_category_folders(dir.path(), CATEGORIES, true);
        assert_eq!(stats.created, 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_year_dir() {
        let dir = TempDir::new().unwrap();
        let stats = create_category_folders(&dir.path().join("2031"), CATEGORIES, false);
        assert_eq!(stats, CategoryStats::default());
        assert!(!dir.path().join("2031").exists());
    }

    #[test]
    fn test_blocked_by_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("01_Finanzen"), "not a dir").unwrap();
        let stats = create_category_folders(dir.path(), &["01_Finanzen/sub"], false);
        assert_eq!(stats.skipped, 1);
    }
}
