//! Sequential batch organiser: extract, plan, move, one file at a time.
//!
//! No per-file failure escapes a batch; everything ends up in the
//! returned [`BatchReport`].

use crate::extraction::{DocumentExtractor, ExtractionMethod, ExtractionResult};
use crate::history::UndoStore;
use crate::mutation::{MoveOutcome, SafeMover};
use crate::sanitize::sanitize_file_name;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Safety limit on files handled per run
pub const DEFAULT_MAX_FILES: usize = 500;

/// Where a file should go
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    pub target_dir: PathBuf,
    pub name: String,
}

/// Decides the archive location of a file from its extracted text.
///
/// `None` leaves the file where it is.
pub trait RenamePlanner {
    fn plan(&self, path: &Path, extraction: &ExtractionResult) -> Option<PlannedMove>;
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub max_files: usize,
    /// Plan only; nothing is moved or recorded
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Files looked at (moved, skipped or failed)
    pub processed: usize,
    /// Left as is: no text, no plan, or already in place
    pub skipped: usize,
    pub failed: usize,
    pub moves: Vec<BatchMove>,
    pub errors: Vec<BatchFailure>,
    /// Set when files were left unprocessed because of `max_files`
    pub limit_reached: bool,
}

/// Organise `files` in order, stopping after `options.max_files`
pub fn organize_batch<S: UndoStore + ?Sized>(
    files: &[PathBuf],
    extractor: &DocumentExtractor,
    planner: &dyn RenamePlanner,
    mover: &SafeMover<'_, S>,
    options: BatchOptions,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (index, path) in files.iter().enumerate() {
        if report.processed >= options.max_files {
            report.limit_reached = true;
            tracing::warn!(
                "[Batch] Safety limit reached ({}), {} file(s) left",
                options.max_files,
                files.len() - index
            );
            break;
        }
        report.processed += 1;

        let extraction = extractor.extract(path);
        if extraction.method == ExtractionMethod::None || extraction.is_empty() {
            tracing::info!("[Batch] No text for {}, leaving as is", path.display());
            report.skipped += 1;
            continue;
        }

        let Some(plan) = planner.plan(path, &extraction) else {
            tracing::debug!("[Batch] No plan for {}", path.display());
            report.skipped += 1;
            continue;
        };

        if options.dry_run {
            report.moves.push(BatchMove {
                from: path.clone(),
                to: plan.target_dir.join(sanitize_file_name(&plan.name)),
            });
            continue;
        }

        match mover.safe_move(path, &plan.target_dir, &plan.name) {
            Ok(MoveOutcome::Moved { path: to, .. }) => report.moves.push(BatchMove {
                from: path.clone(),
                to,
            }),
            Ok(_) => report.skipped += 1,
            Err(e) => {
                tracing::warn!("[Batch] Failed to move {}: {}", path.display(), e);
                report.failed += 1;
                report.errors.push(BatchFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "[Batch] {} processed, {} moved, {} skipped, {} failed",
        report.processed,
        report.moves.len(),
        report.skipped,
        report.failed
    );
    report
}

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("Invalid regex"));

static GERMAN_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").expect("Invalid regex"));

/// Renames a file in place to `YYYY-MM-DD_<original name>`, using the
/// first valid date found in its text.
pub struct DatePrefixPlanner;

impl DatePrefixPlanner {
    pub fn find_date(text: &str) -> Option<NaiveDate> {
        let iso = ISO_DATE.captures_iter(text).find_map(|c| {
            NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?)
                .map(|d| (c.get(0).map(|m| m.start()).unwrap_or(0), d))
        });
        let german = GERMAN_DATE.captures_iter(text).find_map(|c| {
            NaiveDate::from_ymd_opt(c[3].parse().ok()?, c[2].parse().ok()?, c[1].parse().ok()?)
                .map(|d| (c.get(0).map(|m| m.start()).unwrap_or(0), d))
        });

        match (iso, german) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a.1 } else { b.1 }),
            (a, b) => a.or(b).map(|(_, d)| d),
        }
    }
}

impl RenamePlanner for DatePrefixPlanner {
    fn plan(&self, path: &Path, extraction: &ExtractionResult) -> Option<PlannedMove> {
        let date = Self::find_date(&extraction.text)?;
        let name = path.file_name()?.to_string_lossy();
        Some(PlannedMove {
            target_dir: path.parent()?.to_path_buf(),
            name: format!("{}_{}", date.format("%Y-%m-%d"), name),
        })
    }
}
