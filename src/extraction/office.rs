//! Word processor formats: DOCX via docx-rs, ODT via its zipped
//! `content.xml`, legacy DOC via a printable-run byte scan.

use super::cascade::{Attempt, StepContext};
use super::text::{finish_native, latin1_to_string, read_bounded};
use super::xml::xml_to_text;
use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of Windows-1252-ish printable text inside a binary .doc
static DOC_TEXT_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x20-\x7EÀ-ÿ\t\r\n]{12,}").expect("Invalid regex")
});

/// Runs that are mostly letters are likely prose
const DOC_MIN_LETTER_RATIO: f32 = 0.6;

/// Extract text from DOCX using docx-rs
pub(crate) fn extract_docx(ctx: &StepContext<'_>) -> Attempt {
    tracing::debug!("[Extractor] Extracting DOCX: {}", ctx.path.display());

    let bytes = match std::fs::read(ctx.path) {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Failed(format!("Failed to read DOCX file: {}", e)),
    };

    let doc = match docx_rs::read_docx(&bytes) {
        Ok(doc) => doc,
        Err(e) => return Attempt::Failed(format!("Failed to parse DOCX: {}", e)),
    };

    let mut all_text = String::new();
    for child in &doc.document.children {
        push_docx_content(child, &mut all_text);
    }

    non_empty(finish_native(&all_text), "DOCX has no text")
}

/// Walk body elements, one line per paragraph and table row
fn push_docx_content(element: &docx_rs::DocumentChild, output: &mut String) {
    match element {
        docx_rs::DocumentChild::Paragraph(para) => {
            push_paragraph(para, output);
            output.push('\n');
        }
        docx_rs::DocumentChild::Table(table) => {
            for row in &table.rows {
                let docx_rs::TableChild::TableRow(tr) = row;
                for cell in &tr.cells {
                    let docx_rs::TableRowChild::TableCell(tc) = cell;
                    for child in &tc.children {
                        if let docx_rs::TableCellContent::Paragraph(para) = child {
                            push_paragraph(para, output);
                            output.push_str(" | ");
                        }
                    }
                }
                output.push('\n');
            }
        }
        _ => {}
    }
}

fn push_paragraph(para: &docx_rs::Paragraph, output: &mut String) {
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run(run, output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        push_run(run, output);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        match run_child {
            docx_rs::RunChild::Text(text) => output.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => output.push('\t'),
            docx_rs::RunChild::Break(_) => output.push('\n'),
            _ => {}
        }
    }
}

/// Extract text from an OpenDocument text file
pub(crate) fn extract_odt(ctx: &StepContext<'_>) -> Attempt {
    let file = match std::fs::File::open(ctx.path) {
        Ok(file) => file,
        Err(e) => return Attempt::Failed(format!("Failed to open ODT: {}", e)),
    };
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(e) => return Attempt::Failed(format!("ODT is not a valid zip: {}", e)),
    };

    let limit = ctx.config.max_file_size_bytes;
    let (bytes, truncated) = match archive.by_name("content.xml") {
        Ok(entry) => match read_bounded(entry, limit) {
            Ok(read) => read,
            Err(e) => return Attempt::Failed(format!("Failed to read content.xml: {}", e)),
        },
        Err(e) => return Attempt::Failed(format!("ODT has no content.xml: {}", e)),
    };
    let xml = String::from_utf8_lossy(&bytes);

    // Only the body carries document text
    let body = match (xml.find("<office:body"), xml.rfind("</office:body>")) {
        (Some(start), Some(end)) if start < end => &xml[start..end],
        (Some(start), None) if truncated => &xml[start..],
        _ => &xml[..],
    };

    match non_empty(finish_native(&xml_to_text(body)), "ODT has no text") {
        Attempt::Extracted { text, mut warnings } if truncated => {
            tracing::warn!(
                "[Extractor] {}: content.xml exceeds {} bytes",
                ctx.path.display(),
                limit
            );
            warnings.push(format!("content.xml exceeds {} bytes, only the start was read", limit));
            Attempt::Extracted { text, warnings }
        }
        attempt => attempt,
    }
}

/// Best-effort text recovery from a binary Word 97-2003 file.
///
/// Always reported as insufficient: a real converter wins when present.
pub(crate) fn recover_doc(ctx: &StepContext<'_>) -> Attempt {
    let bytes = match std::fs::read(ctx.path) {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Failed(format!("Failed to read DOC file: {}", e)),
    };

    let text = recover_printable_runs(&bytes);
    let reason = if text.is_empty() {
        "no readable text in binary document".to_string()
    } else {
        "recovered by byte scan, formatting lost".to_string()
    };
    Attempt::Insufficient { text, reason }
}

fn recover_printable_runs(bytes: &[u8]) -> String {
    let decoded = latin1_to_string(bytes);
    let runs: Vec<&str> = DOC_TEXT_RUNS
        .find_iter(&decoded)
        .map(|m| m.as_str().trim())
        .filter(|run| looks_like_prose(run))
        .collect();
    finish_native(&runs.join("\n"))
}

fn looks_like_prose(run: &str) -> bool {
    let total = run.chars().count();
    if total == 0 {
        return false;
    }
    let letters = run.chars().filter(|c| c.is_alphabetic() || *c == ' ').count();
    letters as f32 / total as f32 >= DOC_MIN_LETTER_RATIO
}

fn non_empty(text: String, reason: &str) -> Attempt {
    if text.trim().is_empty() {
        Attempt::Insufficient {
            text,
            reason: reason.to_string(),
        }
    } else {
        Attempt::extracted(text)
    }
}
