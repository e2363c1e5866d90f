//! Plain-text reading and shared text cleanup.

use super::cascade::{Attempt, StepContext};
use std::io::Read;

/// Maximum text length kept from native readers (~500KB of text)
pub(crate) const MAX_TEXT_CHARS: usize = 500_000;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read at most `limit` bytes; the flag is set when the input had more
pub(crate) fn read_bounded<R: Read>(reader: R, limit: u64) -> std::io::Result<(Vec<u8>, bool)> {
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    let truncated = bytes.len() as u64 > limit;
    if truncated {
        bytes.truncate(limit as usize);
    }
    Ok((bytes, truncated))
}

/// Read a text file: UTF-8 first, Latin-1 when that fails
pub(crate) fn read_text(ctx: &StepContext<'_>) -> Attempt {
    let bytes = match std::fs::read(ctx.path) {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Failed(format!("Failed to read text file: {}", e)),
    };

    let (text, nul_count) = decode_text(&bytes);
    let mut warnings = Vec::new();
    if nul_count > 0 {
        warnings.push(format!("Removed {} embedded NUL byte(s)", nul_count));
    }

    tracing::debug!(
        "[Extractor] Direct read: {} bytes -> {} chars from {}",
        bytes.len(),
        text.chars().count(),
        ctx.path.display()
    );

    Attempt::Extracted {
        text: truncate_chars(&text, MAX_TEXT_CHARS),
        warnings,
    }
}

/// Decode file bytes, returning the text and the number of NULs dropped
pub(crate) fn decode_text(bytes: &[u8]) -> (String, usize) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let decoded = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            tracing::debug!("[Extractor] Invalid UTF-8, decoding as Latin-1");
            latin1_to_string(bytes)
        }
    };

    let nul_count = decoded.matches('\0').count();
    if nul_count == 0 {
        return (decoded, 0);
    }
    (decoded.replace('\0', ""), nul_count)
}

/// Every byte maps to the code point of the same value
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Trim every line and drop empty ones
pub(crate) fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean native reader output and cap its length
pub(crate) fn finish_native(text: &str) -> String {
    truncate_chars(&clean_text(text), MAX_TEXT_CHARS)
}

/// Truncate to at most `max_chars` characters, preferring a paragraph,
/// sentence or word boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((idx, _)) => idx,
        None => return text.to_string(),
    };
    let truncated = &text[..cut];

    // Paragraph and sentence breaks only count near the end of the budget
    let min_break = truncated.len() - truncated.len() / 5;

    if let Some(pos) = truncated.rfind("\n\n").filter(|&pos| pos >= min_break) {
        return truncated[..pos].to_string();
    }

    if let Some(pos) = truncated.rfind(". ").filter(|&pos| pos >= min_break) {
        return truncated[..=pos].to_string();
    }

    if let Some(pos) = truncated.rfind(char::is_whitespace) {
        return truncated[..pos].trim_end().to_string();
    }

    truncated.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        let (text, nuls) = decode_text("Grüße".as_bytes());
        assert_eq!(text, "Grüße");
        assert_eq!(nuls, 0);
    }

    #[test]
    fn test_latin1_fallback() {
        // "Grüße" in ISO-8859-1
        let (text, _) = decode_text(&[0x47, 0x72, 0xFC, 0xDF, 0x65]);
        assert_eq!(text, "Grüße");
    }

    #[test]
    fn test_nul_bytes_removed_and_counted() {
        let (text, nuls) = decode_text(b"a\0b\0\0c");
        assert_eq!(text, "abc");
        assert_eq!(nuls, 3);
    }

    #[test]
    fn test_bom_stripped() {
        let (text, _) = decode_text(b"\xEF\xBB\xBFhello");
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\n\t\n b  \n"), "a\nb");
    }

    #[test]
    fn test_truncate_on_word_boundary() {
        assert_eq!(truncate_chars("eins zwei drei", 9), "eins");
        assert_eq!(truncate_chars("kurz", 10), "kurz");
        assert_eq!(truncate_chars("Satz eins. Satz zwei", 15), "Satz eins.");
        assert_eq!(truncate_chars("äöüäöü", 3), "äöü");
    }

    #[test]
    fn test_read_bounded() {
        assert_eq!(read_bounded(&b"abcdef"[..], 4).unwrap(), (b"abcd".to_vec(), true));
        assert_eq!(read_bounded(&b"abcd"[..], 4).unwrap(), (b"abcd".to_vec(), false));
    }

    #[test]
    fn test_truncate_keeps_body_after_early_heading() {
        let text = format!("Finanzamt Koeln\n\n{}", "Steuerbescheid fuer 2023 ".repeat(400));
        let capped = truncate_chars(&text, 5000);

        assert!(capped.starts_with("Finanzamt Koeln\n\nSteuerbescheid"));
        assert!(capped.chars().count() > 4900);
        assert!(capped.chars().count() <= 5000);
    }

    #[test]
    fn test_truncate_prefers_late_paragraph_break() {
        let text = format!("{}\n\nRest", "x ".repeat(45));
        assert_eq!(truncate_chars(&text, 95), "x ".repeat(45));
    }
}
