//! OCR subsystem.
//!
//! Renders documents to images, runs an external OCR engine per image
//! under a hard timeout and concatenates the page texts. Scratch space
//! lives in a per-call temporary directory that is removed on every exit
//! path.

mod process;
mod tesseract;

pub use process::{run_tool, ToolOutput};
pub use tesseract::TesseractOcr;

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("{0} not found (is it installed and on PATH?)")]
    ToolMissing(String),

    #[error("{tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("{tool} failed ({status}): {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("No page images were rendered")]
    NoPages,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns an image or a multi-page document into text.
///
/// `multi_page` inputs (PDFs) are rendered first; everything else is
/// handed to the engine as an image.
pub trait OcrEngine {
    fn recognize(&self, input: &Path, multi_page: bool) -> Result<String, OcrError>;
}
