//! PDF text layer extraction via pdf-extract.

use super::cascade::{Attempt, StepContext};
use super::text::finish_native;

/// Extract the embedded text layer.
///
/// Fewer than `native_min_chars` characters means the PDF is presumed to
/// be a scan; the partial text is handed back as insufficient so OCR runs.
pub(crate) fn extract_text_layer(ctx: &StepContext<'_>) -> Attempt {
    tracing::debug!("[Extractor] Starting PDF extraction: {}", ctx.path.display());

    let bytes = match std::fs::read(ctx.path) {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Failed(format!("Failed to read PDF file: {}", e)),
    };

    let text = match text_from_bytes(&bytes) {
        Ok(text) => text,
        Err(e) => return Attempt::Failed(e),
    };

    let char_count = text.chars().count();
    if char_count < ctx.config.native_min_chars {
        return Attempt::Insufficient {
            text,
            reason: format!(
                "text layer has {} chars (< {}), likely scanned",
                char_count, ctx.config.native_min_chars
            ),
        };
    }

    Attempt::extracted(text)
}

/// Text of an in-memory PDF, cleaned and capped
pub(crate) fn text_from_bytes(bytes: &[u8]) -> Result<String, String> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| format!("PDF extraction failed: {}", e))?;

    let text = finish_native(&raw);
    tracing::debug!(
        "[Extractor] PDF raw extraction: {} chars -> {} chars after cleaning",
        raw.len(),
        text.len()
    );
    Ok(text)
}
