//! Generic text converters found on PATH, used when built-in readers fail.

use super::cascade::{Attempt, StepContext};
use super::text::finish_native;
use super::SourceFormat;
use crate::ocr::run_tool;
use std::ffi::OsString;
use std::path::Path;

/// A converter binary and how to call it for one input file
struct Converter {
    program: &'static str,
    args: fn(&Path) -> Vec<OsString>,
}

static DOC_CONVERTERS: [Converter; 3] = [
    Converter {
        program: "textutil",
        args: textutil_args,
    },
    Converter {
        program: "antiword",
        args: path_only,
    },
    Converter {
        program: "catdoc",
        args: path_only,
    },
];

static MARKUP_CONVERTERS: [Converter; 2] = [
    Converter {
        program: "textutil",
        args: textutil_args,
    },
    Converter {
        program: "pandoc",
        args: pandoc_args,
    },
];

/// macOS `textutil -convert txt -stdout <file>`
fn textutil_args(path: &Path) -> Vec<OsString> {
    vec!["-convert".into(), "txt".into(), "-stdout".into(), path.into()]
}

fn pandoc_args(path: &Path) -> Vec<OsString> {
    vec!["-t".into(), "plain".into(), path.into()]
}

fn path_only(path: &Path) -> Vec<OsString> {
    vec![path.into()]
}

fn candidates(format: SourceFormat) -> &'static [Converter] {
    match format {
        SourceFormat::Doc => &DOC_CONVERTERS,
        SourceFormat::Docx | SourceFormat::Odt | SourceFormat::Rtf => &MARKUP_CONVERTERS,
        _ => &[],
    }
}

/// Run the first installed converter that produces text
pub(crate) fn convert(ctx: &StepContext<'_>) -> Attempt {
    let installed: Vec<&Converter> = candidates(ctx.format)
        .iter()
        .filter(|c| which::which(c.program).is_ok())
        .collect();

    if installed.is_empty() {
        return Attempt::Skip("no text converter installed".to_string());
    }

    let mut failures = Vec::new();
    for converter in installed {
        match run_tool(converter.program, (converter.args)(ctx.path), ctx.config.ocr_timeout()) {
            Ok(output) => {
                let text = finish_native(&output.stdout_text());
                if !text.is_empty() {
                    tracing::debug!(
                        "[Extractor] {} converted {} ({} chars)",
                        converter.program,
                        ctx.path.display(),
                        text.chars().count()
                    );
                    return Attempt::extracted(text);
                }
                failures.push(format!("{} produced no text", converter.program));
            }
            Err(e) => failures.push(e.to_string()),
        }
    }

    Attempt::Failed(failures.join("; "))
}
