//! Ordered fallback over extraction attempts.

use super::text::truncate_chars;
use super::{ExtractionMethod, SourceFormat};
use crate::config::Config;
use crate::ocr::OcrEngine;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Usable text; ends the cascade
    Extracted { text: String, warnings: Vec<String> },
    /// Some text, but not enough to trust; later steps still run
    Insufficient { text: String, reason: String },
    /// Step does not apply (e.g. no tool installed)
    Skip(String),
    /// Step ran and failed
    Failed(String),
}

impl Attempt {
    pub fn extracted(text: String) -> Self {
        Attempt::Extracted {
            text,
            warnings: Vec::new(),
        }
    }
}

pub(crate) struct StepContext<'a> {
    pub path: &'a Path,
    pub format: SourceFormat,
    pub config: &'a Config,
    pub ocr: &'a dyn OcrEngine,
}

pub(crate) struct Step {
    pub name: &'static str,
    pub method: ExtractionMethod,
    pub run: fn(&StepContext<'_>) -> Attempt,
}

impl Step {
    pub const fn native(name: &'static str, run: fn(&StepContext<'_>) -> Attempt) -> Self {
        Self {
            name,
            method: ExtractionMethod::Native,
            run,
        }
    }

    pub const fn ocr(name: &'static str, run: fn(&StepContext<'_>) -> Attempt) -> Self {
        Self {
            name,
            method: ExtractionMethod::Ocr,
            run,
        }
    }

    pub const fn legacy_tool(name: &'static str, run: fn(&StepContext<'_>) -> Attempt) -> Self {
        Self {
            name,
            method: ExtractionMethod::LegacyTool,
            run,
        }
    }
}

#[derive(Debug)]
pub(crate) struct CascadeOutcome {
    pub text: String,
    pub method: ExtractionMethod,
    pub warnings: Vec<String>,
}

/// Run `steps` in order until one extracts text.
///
/// When none does, the longest insufficient partial text wins, tagged with
/// the method of the step that produced it.
pub(crate) fn run(steps: &[Step], ctx: &StepContext<'_>) -> CascadeOutcome {
    let mut warnings = Vec::new();
    let mut best: Option<(String, ExtractionMethod)> = None;

    for step in steps {
        let attempt = match catch_unwind(AssertUnwindSafe(|| (step.run)(ctx))) {
            Ok(attempt) => attempt,
            Err(_panic) => {
                tracing::error!(
                    "[Extractor] {} PANICKED on {} - malformed input",
                    step.name,
                    ctx.path.display()
                );
                Attempt::Failed("reader panicked on malformed input".to_string())
            }
        };

        match attempt {
            Attempt::Extracted {
                text,
                warnings: step_warnings,
            } => {
                warnings.extend(step_warnings);
                return CascadeOutcome {
                    text,
                    method: step.method,
                    warnings,
                };
            }
            Attempt::Insufficient { text, reason } => {
                tracing::debug!(
                    "[Extractor] {} insufficient for {}: {}",
                    step.name,
                    ctx.path.display(),
                    reason
                );
                warnings.push(format!("{}: {}", step.name, reason));
                let longer = best
                    .as_ref()
                    .map(|(kept, _)| text.chars().count() > kept.chars().count())
                    .unwrap_or(true);
                if longer && !text.trim().is_empty() {
                    best = Some((text, step.method));
                }
            }
            Attempt::Skip(reason) => {
                tracing::debug!("[Extractor] {} skipped: {}", step.name, reason);
                warnings.push(format!("{}: {}", step.name, reason));
            }
            Attempt::Failed(reason) => {
                tracing::warn!(
                    "[Extractor] {} failed for {}: {}",
                    step.name,
                    ctx.path.display(),
                    reason
                );
                warnings.push(format!("{}: {}", step.name, reason));
            }
        }
    }

    match best {
        Some((text, method)) => CascadeOutcome {
            text,
            method,
            warnings,
        },
        None => {
            warnings.push("No text could be extracted".to_string());
            CascadeOutcome {
                text: String::new(),
                method: ExtractionMethod::None,
                warnings,
            }
        }
    }
}

/// OCR a multi-page document (rendered first)
pub(crate) fn ocr_document(ctx: &StepContext<'_>) -> Attempt {
    run_ocr(ctx, true)
}

/// OCR an image file directly
pub(crate) fn ocr_image(ctx: &StepContext<'_>) -> Attempt {
    run_ocr(ctx, false)
}

fn run_ocr(ctx: &StepContext<'_>, multi_page: bool) -> Attempt {
    match ctx.ocr.recognize(ctx.path, multi_page) {
        Ok(text) => {
            let text = truncate_chars(text.trim(), ctx.config.max_text_preview_chars);
            if text.is_empty() {
                Attempt::Insufficient {
                    text,
                    reason: "OCR produced no text".to_string(),
                }
            } else {
                Attempt::extracted(text)
            }
        }
        Err(e) => Attempt::Failed(format!("OCR failed: {}", e)),
    }
}
