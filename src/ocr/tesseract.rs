//! Tesseract-backed OCR with pdftoppm page rendering.

use super::process::run_tool;
use super::{OcrEngine, OcrError};
use crate::config::Config;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Prefix pdftoppm uses for rendered page files (`page-1.png`, `page-01.png`, ...)
const PAGE_PREFIX: &str = "page";

pub struct TesseractOcr {
    pdftoppm_bin: String,
    tesseract_bin: String,
    language: String,
    page_segmentation_mode: u32,
    dpi: u32,
    max_pages: u32,
    timeout: Duration,
    temp_root: Option<PathBuf>,
}

impl TesseractOcr {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            tesseract_bin: config.tesseract_bin.clone(),
            language: config.ocr_language.clone(),
            page_segmentation_mode: config.ocr_page_segmentation_mode,
            dpi: config.ocr_dpi,
            max_pages: config.ocr_max_pages.max(1),
            timeout: config.ocr_timeout(),
            temp_root: config.temp_root.clone(),
        }
    }

    /// Whether both the renderer and the OCR binary can be found
    pub fn is_available(&self) -> bool {
        which::which(&self.pdftoppm_bin).is_ok() && which::which(&self.tesseract_bin).is_ok()
    }

    /// Per-call scratch directory, removed when the returned guard drops
    fn scratch_dir(&self) -> Result<TempDir, OcrError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docarchive-ocr-");
        let dir = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        tracing::debug!("[Ocr] Scratch dir {}", dir.path().display());
        Ok(dir)
    }

    fn render_pages(&self, document: &Path, scratch: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let args: Vec<OsString> = vec![
            "-png".into(),
            "-r".into(),
            self.dpi.to_string().into(),
            "-f".into(),
            "1".into(),
            "-l".into(),
            self.max_pages.to_string().into(),
            document.into(),
            scratch.join(PAGE_PREFIX).into(),
        ];
        run_tool(&self.pdftoppm_bin, args, self.timeout)?;

        let pages = list_page_images(scratch)?;
        if pages.is_empty() {
            return Err(OcrError::NoPages);
        }
        Ok(pages)
    }

    fn recognize_image(&self, image: &Path) -> Result<String, OcrError> {
        let args: Vec<OsString> = vec![
            image.into(),
            "stdout".into(),
            "-l".into(),
            self.language.clone().into(),
            "--psm".into(),
            self.page_segmentation_mode.to_string().into(),
        ];
        let output = run_tool(&self.tesseract_bin, args, self.timeout)?;
        if !output.stderr.is_empty() {
            tracing::debug!(
                "[Ocr] tesseract on {}: {}",
                image.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.stdout_text().trim().to_string())
    }

    fn recognize_document(&self, document: &Path) -> Result<String, OcrError> {
        let scratch = self.scratch_dir()?;
        let result = self.recognize_pages(document, scratch.path());

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                "[Ocr] Failed to remove scratch dir {}: {}",
                scratch_path.display(),
                e
            );
        }

        result
    }

    fn recognize_pages(&self, document: &Path, scratch: &Path) -> Result<String, OcrError> {
        let pages = self.render_pages(document, scratch)?;
        tracing::debug!("[Ocr] Rendered {} page(s) of {}", pages.len(), document.display());

        let mut texts = Vec::with_capacity(pages.len());
        let mut last_error = None;
        for (i, page) in pages.iter().enumerate() {
            match self.recognize_image(page) {
                Ok(text) => {
                    if !text.is_empty() {
                        texts.push(text);
                    }
                }
                Err(e) => {
                    tracing::warn!("[Ocr] Page {} of {} skipped: {}", i + 1, document.display(), e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if texts.is_empty() => Err(e),
            _ => Ok(texts.join("\n\n")),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, input: &Path, multi_page: bool) -> Result<String, OcrError> {
        if multi_page {
            self.recognize_document(input)
        } else {
            self.recognize_image(input)
        }
    }
}

/// Rendered page images in page order
fn list_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

/// `page-07.png` -> 7
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    digits.parse().ok()
}
