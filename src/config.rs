//! Engine configuration.
//!
//! Loaded once at startup: defaults, then `<config_dir>/docarchive/config.json`,
//! then `DOCARCHIVE_*` environment overrides. The resulting value is passed
//! explicitly to every subsystem.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application directory name under the platform config dir
const APP_DIR: &str = "docarchive";

/// Config filename
const CONFIG_FILENAME: &str = "config.json";

/// Undo log filename
const UNDO_LOG_FILENAME: &str = "undo_log.json";

/// Default archive category folders created under each year directory
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "01_Finanzen",
    "02_Vertraege",
    "03_Gesundheit",
    "04_Versicherungen",
    "05_Steuern",
    "06_Reisen",
    "07_Beruf",
    "08_Bildung",
    "09_Auto",
    "10_Wohnen",
    "99_Sonstiges",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Tesseract language model(s), e.g. `deu+eng`
    pub ocr_language: String,
    /// Hard timeout for each external tool invocation
    pub ocr_timeout_ms: u64,
    /// Files above this size are not parsed
    pub max_file_size_bytes: u64,
    /// Upper bound on OCR output and on classification excerpts
    pub max_text_preview_chars: usize,
    /// Pages rendered for OCR of multi-page documents
    pub ocr_max_pages: u32,
    /// Render resolution for OCR
    pub ocr_dpi: u32,
    /// Tesseract `--psm` value
    pub ocr_page_segmentation_mode: u32,
    /// Below this many characters a PDF text layer counts as missing
    pub native_min_chars: usize,
    /// Records closer together than this belong to the same undo batch
    pub undo_batch_gap_secs: i64,
    /// Location of the persisted undo log
    pub undo_log_path: Option<PathBuf>,
    /// Parent directory for OCR scratch directories (system temp if unset)
    pub temp_root: Option<PathBuf>,
    pub pdftoppm_bin: String,
    pub tesseract_bin: String,
    /// Category folders created under each archive year
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr_language: "deu+eng".to_string(),
            ocr_timeout_ms: 30_000,
            max_file_size_bytes: 100 * 1024 * 1024,
            max_text_preview_chars: 5000,
            ocr_max_pages: 5,
            ocr_dpi: 300,
            ocr_page_segmentation_mode: 3,
            native_min_chars: 50,
            undo_batch_gap_secs: 5,
            undo_log_path: None,
            temp_root: None,
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
            categories: DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Config {
    /// Platform config directory for the application (~/.config/docarchive)
    pub fn app_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        Self::app_dir().join(CONFIG_FILENAME)
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from a specific file, then apply env overrides.
    ///
    /// A missing or unreadable file is not an error: defaults are used and
    /// the problem is logged.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::read_file(path) {
                Ok(config) => {
                    tracing::debug!("[Config] Loaded {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("[Config] Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config
    }

    fn read_file(path: &Path) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("Failed to open config: {}", e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(lang) = std::env::var("DOCARCHIVE_OCR_LANGUAGE") {
            if !lang.trim().is_empty() {
                self.ocr_language = lang;
            }
        }
        if let Some(ms) = env_number("DOCARCHIVE_OCR_TIMEOUT_MS") {
            self.ocr_timeout_ms = ms;
        }
        if let Some(bytes) = env_number("DOCARCHIVE_MAX_FILE_SIZE") {
            self.max_file_size_bytes = bytes;
        }
        if let Ok(path) = std::env::var("DOCARCHIVE_UNDO_LOG") {
            if !path.trim().is_empty() {
                self.undo_log_path = Some(PathBuf::from(path));
            }
        }
    }

    /// Resolved undo log location
    pub fn undo_log_path(&self) -> PathBuf {
        self.undo_log_path
            .clone()
            .unwrap_or_else(|| Self::app_dir().join(UNDO_LOG_FILENAME))
    }

    pub fn ocr_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ocr_timeout_ms)
    }
}

fn env_number(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("[Config] Ignoring non-numeric {}={}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ocr_timeout_ms, 30_000);
        assert_eq!(config.ocr_max_pages, 5);
        assert_eq!(config.native_min_chars, 50);
        assert_eq!(config.categories.len(), DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"{{"ocrLanguage": "fra", "maxTextPreviewChars": 1200}}"#).unwrap();

        let config = Config::read_file(file.path()).unwrap();
        assert_eq!(config.ocr_language, "fra");
        assert_eq!(config.max_text_preview_chars, 1200);
        assert_eq!(config.ocr_dpi, 300);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, "not json").unwrap();

        let config = Config::load_from(file.path());
        assert_eq!(config.ocr_dpi, 300);
    }
}
