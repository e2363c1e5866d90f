//! Command-line front end: every subcommand prints camelCase JSON.

use clap::{Parser, Subcommand};
use docarchive::archive::{create_category_folders, CategoryStats};
use docarchive::batch::{organize_batch, BatchOptions, DatePrefixPlanner, DEFAULT_MAX_FILES};
use docarchive::dupes::{collect_files, find_duplicates};
use docarchive::folders::{find_folder, DEFAULT_MAX_DEPTH};
use docarchive::history::UndoLogSummary;
use docarchive::ocr::TesseractOcr;
use docarchive::scanner::{find_unformatted_files, DEFAULT_SCAN_DEPTH, DEFAULT_SCAN_EXTENSIONS};
use docarchive::{undo_last_batch, Config, DocumentExtractor, JsonUndoStore, SafeMover, UndoStore};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docarchive")]
#[command(about = "Extract document text and reorganize an archive safely, with undo")]
#[command(version)]
struct Cli {
    /// Config file path (overrides the platform config location)
    #[arg(short, long, global = true, env = "DOCARCHIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the text of a document
    Extract {
        path: PathBuf,
        /// Truncate the printed text to this many characters
        #[arg(long)]
        preview: Option<usize>,
    },

    /// Move a file into a directory under a new name (never overwrites)
    Move {
        source: PathBuf,
        target_dir: PathBuf,
        name: String,
    },

    /// Reverse the most recent batch of moves
    Undo {
        /// Show the undo log summary instead of undoing
        #[arg(long)]
        status: bool,
    },

    /// Group files below a directory by identical content
    Dupes {
        dir: PathBuf,
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Typo-tolerant folder lookup
    FindFolder {
        query: String,
        root: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_MAX_DEPTH)]
        depth: usize,
    },

    /// List files that do not carry a YYYY-MM-DD_ prefix yet
    Scan {
        root: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_SCAN_DEPTH)]
        depth: usize,
    },

    /// Date-prefix unformatted files using the first date found in their text
    Organize {
        root: PathBuf,
        #[arg(short, long, default_value_t = DEFAULT_SCAN_DEPTH)]
        depth: usize,
        /// Safety limit on files per run
        #[arg(short, long, default_value_t = DEFAULT_MAX_FILES)]
        limit: usize,
        #[arg(long)]
        dry_run: bool,
    },

    /// Create the category folders under one or more year directories
    Categories {
        #[arg(required = true)]
        year_dirs: Vec<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the effective configuration and OCR tool availability
    Check,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    ocr_available: bool,
    undo_log_path: PathBuf,
    config: &'a Config,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Default: warn for most crates, info for ours (per-file summaries visible)
    let default_filter = if cli.verbose {
        "warn,docarchive=debug"
    } else {
        "warn,docarchive=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    match run(cli.command, &config) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<String, String> {
    match command {
        Commands::Extract { path, preview } => {
            let extractor = DocumentExtractor::new(config.clone());
            let mut result = extractor.extract(&path);
            if let Some(max) = preview {
                result.text = result.preview(max).to_string();
            }
            to_json(&result)
        }

        Commands::Move {
            source,
            target_dir,
            name,
        } => {
            let store = undo_store(config);
            let outcome = SafeMover::new(&store).safe_move(&source, &target_dir, &name)?;
            to_json(&outcome)
        }

        Commands::Undo { status } => {
            let store = undo_store(config);
            if status {
                let log = store.load()?;
                return to_json(&UndoLogSummary::from(&log));
            }
            let outcome = undo_last_batch(&store)?;
            to_json(&outcome)
        }

        Commands::Dupes { dir, depth } => {
            let files = collect_files(&dir, depth);
            to_json(&find_duplicates(&files))
        }

        Commands::FindFolder { query, root, depth } => to_json(&find_folder(&query, &root, depth)),

        Commands::Scan { root, depth } => {
            to_json(&find_unformatted_files(&root, depth, DEFAULT_SCAN_EXTENSIONS))
        }

        Commands::Organize {
            root,
            depth,
            limit,
            dry_run,
        } => {
            let files = find_unformatted_files(&root, depth, DEFAULT_SCAN_EXTENSIONS);
            let extractor = DocumentExtractor::new(config.clone());
            let store = undo_store(config);
            let report = organize_batch(
                &files,
                &extractor,
                &DatePrefixPlanner,
                &SafeMover::new(&store),
                BatchOptions {
                    max_files: limit,
                    dry_run,
                },
            );
            to_json(&report)
        }

        Commands::Categories { year_dirs, dry_run } => {
            let mut total = CategoryStats::default();
            for year_dir in &year_dirs {
                total += create_category_folders(year_dir, &config.categories, dry_run);
            }
            to_json(&total)
        }

        Commands::Check => to_json(&CheckReport {
            ocr_available: TesseractOcr::from_config(config).is_available(),
            undo_log_path: config.undo_log_path(),
            config,
        }),
    }
}

fn undo_store(config: &Config) -> JsonUndoStore {
    JsonUndoStore::new(config.undo_log_path())
        .with_gap(chrono::Duration::seconds(config.undo_batch_gap_secs))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize output: {}", e))
}
