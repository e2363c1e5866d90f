//! Document Text Extraction
//!
//! Routes a file to the readers for its format and runs them as a cascade:
//! native parse, then OCR, then an external converter. Every failure is
//! folded into the warnings of the returned [`ExtractionResult`]; nothing
//! here returns an error.
//!
//! ## Supported Formats
//! - PDF: text layer via pdf-extract, OCR when the layer is missing
//! - Word: .docx via docx-rs, legacy .doc via byte scan + converter
//! - Apple Pages: index.xml, IWA frame recovery, QuickLook preview
//! - RTF, ODT: built-in readers with converter fallback
//! - Images: OCR only
//! - Text: .txt, .md, .csv, .log

mod cascade;
mod converter;
pub mod iwa;
mod office;
mod pages;
mod pdf;
mod rtf;
mod text;
mod xml;

use crate::config::Config;
use crate::ocr::{OcrEngine, TesseractOcr};
use cascade::{Step, StepContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Document formats the dispatcher knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Doc,
    Pages,
    Rtf,
    Odt,
    Image,
    Text,
}

impl SourceFormat {
    /// Classify by lowercased extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let format = match ext {
            "pdf" => SourceFormat::Pdf,
            "docx" => SourceFormat::Docx,
            "doc" => SourceFormat::Doc,
            "pages" => SourceFormat::Pages,
            "rtf" => SourceFormat::Rtf,
            "odt" => SourceFormat::Odt,
            "jpg" | "jpeg" | "png" | "tif" | "tiff" | "bmp" => SourceFormat::Image,
            "txt" | "md" | "csv" | "log" => SourceFormat::Text,
            _ => return None,
        };
        Some(format)
    }

    /// Extraction attempts for this format, in fallback order
    fn steps(self) -> &'static [Step] {
        match self {
            SourceFormat::Pdf => &PDF_STEPS,
            SourceFormat::Docx => &DOCX_STEPS,
            SourceFormat::Doc => &DOC_STEPS,
            SourceFormat::Pages => &PAGES_STEPS,
            SourceFormat::Rtf => &RTF_STEPS,
            SourceFormat::Odt => &ODT_STEPS,
            SourceFormat::Image => &IMAGE_STEPS,
            SourceFormat::Text => &TEXT_STEPS,
        }
    }
}

static PDF_STEPS: [Step; 2] = [
    Step::native("pdf text layer", pdf::extract_text_layer),
    Step::ocr("pdf ocr", cascade::ocr_document),
];
static DOCX_STEPS: [Step; 2] = [
    Step::native("docx reader", office::extract_docx),
    Step::legacy_tool("converter", converter::convert),
];
static DOC_STEPS: [Step; 2] = [
    Step::native("doc byte scan", office::recover_doc),
    Step::legacy_tool("converter", converter::convert),
];
static ODT_STEPS: [Step; 2] = [
    Step::native("odt reader", office::extract_odt),
    Step::legacy_tool("converter", converter::convert),
];
static RTF_STEPS: [Step; 2] = [
    Step::native("rtf reader", rtf::extract_rtf),
    Step::legacy_tool("converter", converter::convert),
];
static PAGES_STEPS: [Step; 1] = [Step::native("pages reader", pages::extract_pages)];
static IMAGE_STEPS: [Step; 1] = [Step::ocr("image ocr", cascade::ocr_image)];
static TEXT_STEPS: [Step; 1] = [Step::native("text reader", text::read_text)];

/// How the returned text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    Native,
    Ocr,
    LegacyTool,
    None,
}

/// Uniform result of [`DocumentExtractor::extract`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub path: PathBuf,
    /// Possibly empty, never absent
    pub text: String,
    /// `None` for unsupported extensions
    pub source_format: Option<SourceFormat>,
    pub method: ExtractionMethod,
    pub warnings: Vec<String>,
    pub char_count: usize,
}

impl ExtractionResult {
    fn new(
        path: &Path,
        text: String,
        source_format: Option<SourceFormat>,
        method: ExtractionMethod,
        warnings: Vec<String>,
    ) -> Self {
        let char_count = text.chars().count();
        Self {
            path: path.to_path_buf(),
            text,
            source_format,
            method,
            warnings,
            char_count,
        }
    }

    fn empty(path: &Path, source_format: Option<SourceFormat>, warning: String) -> Self {
        Self::new(
            path,
            String::new(),
            source_format,
            ExtractionMethod::None,
            vec![warning],
        )
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Character-bounded excerpt of the text
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// Text extractor for all supported document formats
pub struct DocumentExtractor {
    config: Config,
    ocr: Box<dyn OcrEngine>,
}

impl DocumentExtractor {
    /// Extractor using Tesseract for OCR
    pub fn new(config: Config) -> Self {
        let ocr = Box::new(TesseractOcr::from_config(&config));
        Self::with_ocr_engine(config, ocr)
    }

    pub fn with_ocr_engine(config: Config, ocr: Box<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }

    /// Extract the text of `path`.
    ///
    /// Unsupported, unreadable and oversized files come back with
    /// `method = None` and a warning.
    pub fn extract(&self, path: &Path) -> ExtractionResult {
        let Some(format) = SourceFormat::from_path(path) else {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            tracing::debug!("[Extractor] Unsupported file type '{}': {}", ext, path.display());
            return ExtractionResult::empty(
                path,
                None,
                format!("Unsupported file type: '{}'", ext),
            );
        };

        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("[Extractor] Cannot read {}: {}", path.display(), e);
                return ExtractionResult::empty(
                    path,
                    Some(format),
                    format!("Cannot read file: {}", e),
                );
            }
        };

        // Legacy Pages documents are package directories
        let is_package = metadata.is_dir() && format == SourceFormat::Pages;
        if !metadata.is_file() && !is_package {
            return ExtractionResult::empty(path, Some(format), "Not a regular file".to_string());
        }

        if metadata.is_file() && metadata.len() > self.config.max_file_size_bytes {
            tracing::warn!(
                "[Extractor] Skipping {} ({} bytes > limit {})",
                path.display(),
                metadata.len(),
                self.config.max_file_size_bytes
            );
            return ExtractionResult::empty(
                path,
                Some(format),
                format!(
                    "File too large: {} bytes (limit {})",
                    metadata.len(),
                    self.config.max_file_size_bytes
                ),
            );
        }

        let ctx = StepContext {
            path,
            format,
            config: &self.config,
            ocr: self.ocr.as_ref(),
        };
        let outcome = cascade::run(format.steps(), &ctx);

        let result = ExtractionResult::new(
            path,
            outcome.text,
            Some(format),
            outcome.method,
            outcome.warnings,
        );

        tracing::info!(
            "[Extractor] {}: {} chars via {:?} ({} warnings)",
            path.file_name().unwrap_or_default().to_string_lossy(),
            result.char_count,
            result.method,
            result.warnings.len()
        );
        if !result.text.is_empty() {
            tracing::debug!("[Extractor] Preview: {}", result.preview(200));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// OCR engine that returns canned text and counts calls
    struct ScriptedOcr {
        reply: Result<String, String>,
        calls: Rc<Cell<usize>>,
    }

    impl OcrEngine for ScriptedOcr {
        fn recognize(&self, _input: &Path, _multi_page: bool) -> Result<String, OcrError> {
            self.calls.set(self.calls.get() + 1);
            self.reply.clone().map_err(|e| OcrError::Failed {
                tool: "scripted".to_string(),
                status: "1".to_string(),
                stderr: e,
            })
        }
    }

    fn extractor(reply: Result<&str, &str>) -> (DocumentExtractor, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let ocr = ScriptedOcr {
            reply: reply.map(str::to_string).map_err(str::to_string),
            calls: Rc::clone(&calls),
        };
        (
            DocumentExtractor::with_ocr_engine(Config::default(), Box::new(ocr)),
            calls,
        )
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("a/B.PDF")), Some(SourceFormat::Pdf));
        assert_eq!(SourceFormat::from_path(Path::new("scan.jpeg")), Some(SourceFormat::Image));
        assert_eq!(SourceFormat::from_path(Path::new("notes.md")), Some(SourceFormat::Text));
        assert_eq!(SourceFormat::from_path(Path::new("sheet.xlsx")), None);
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xyz");
        fs::write(&path, "abc").unwrap();

        let (extractor, _) = extractor(Ok(""));
        let result = extractor.extract(&path);
        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.source_format.is_none());
        assert!(result.text.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_empty_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let (extractor, _) = extractor(Ok(""));
        let result = extractor.extract(&path);
        assert_eq!(result.text, "");
        assert_eq!(result.method, ExtractionMethod::Native);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let (extractor, _) = extractor(Ok(""));
        let result = extractor.extract(Path::new("/nonexistent/brief.txt"));
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.source_format, Some(SourceFormat::Text));
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_oversized_file_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(64)).unwrap();

        let config = Config {
            max_file_size_bytes: 16,
            ..Config::default()
        };
        let extractor = DocumentExtractor::with_ocr_engine(
            config,
            Box::new(ScriptedOcr {
                reply: Ok(String::new()),
                calls: Rc::new(Cell::new(0)),
            }),
        );
        let result = extractor.extract(&path);
        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.warnings[0].contains("too large"));
    }

    #[test]
    fn test_image_goes_straight_to_ocr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("receipt.png");
        fs::write(&path, b"\x89PNG").unwrap();

        let (extractor, calls) = extractor(Ok("Kassenbon 12,50 EUR"));
        let result = extractor.extract(&path);
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.text, "Kassenbon 12,50 EUR");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_image_ocr_failure_degrades() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("receipt.jpg");
        fs::write(&path, b"\xFF\xD8").unwrap();

        let (extractor, calls) = extractor(Err("engine crashed"));
        let result = extractor.extract(&path);
        assert_eq!(calls.get(), 1);
        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result.text.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("engine crashed")));
    }

    #[test]
    fn test_unparseable_pdf_falls_back_to_ocr() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.pdf");
        fs::write(&path, b"%PDF-1.4 garbage").unwrap();

        let (extractor, calls) = extractor(Ok("Rechnung Nr. 4711"));
        let result = extractor.extract(&path);
        assert_eq!(calls.get(), 1);
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(result.text, "Rechnung Nr. 4711");
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_ocr_output_is_capped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.tiff");
        fs::write(&path, b"II*").unwrap();

        let long = "wort ".repeat(5000);
        let (extractor, _) = extractor(Ok(long.as_str()));
        let result = extractor.extract(&path);
        assert!(result.char_count <= Config::default().max_text_preview_chars);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let result = ExtractionResult::new(
            Path::new("x.txt"),
            "Grüße aus Köln".to_string(),
            Some(SourceFormat::Text),
            ExtractionMethod::Native,
            Vec::new(),
        );
        assert_eq!(result.preview(4), "Grüß");
        assert_eq!(result.preview(100), "Grüße aus Köln");
        assert_eq!(result.char_count, 14);
    }
}
