//! File name sanitizer.
//!
//! Pure string transformation, no I/O. Produces names that are safe on
//! macOS, Linux and Windows volumes alike.

use unicode_normalization::UnicodeNormalization;

/// Maximum file name length in bytes (common filesystem limit)
pub const MAX_NAME_BYTES: usize = 255;

/// Name used when nothing usable survives sanitization
pub const FALLBACK_NAME: &str = "unnamed";

/// Characters never allowed in a file name
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a desired file name.
///
/// - Normalizes to NFC (macOS hands out decomposed names)
/// - Drops control characters and path/reserved punctuation
/// - Collapses whitespace runs into a single space
/// - Trims leading/trailing dots and spaces
/// - Truncates to `MAX_NAME_BYTES`, keeping the extension intact
pub fn sanitize_file_name(name: &str) -> String {
    let normalized: String = name.nfc().collect();

    let mut cleaned = String::with_capacity(normalized.len());
    let mut last_was_space = false;
    for c in normalized.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                cleaned.push(' ');
            }
            last_was_space = true;
        } else if c.is_control() || FORBIDDEN_CHARS.contains(&c) {
            continue;
        } else {
            cleaned.push(c);
            last_was_space = false;
        }
    }

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == ' ');
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    truncate_preserving_extension(trimmed, MAX_NAME_BYTES)
}

/// Split a file name into (stem, extension-with-dot).
///
/// Dot-files and names without a dot have no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos < name.len() - 1 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

fn truncate_preserving_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, ext) = split_extension(name);
    // Absurdly long "extensions" are treated as part of the stem
    let (stem, ext) = if ext.len() > 16 { (name, "") } else { (stem, ext) };

    let budget = max_bytes.saturating_sub(ext.len());
    let mut cut = budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    let stem = stem[..cut].trim_end_matches(|c: char| c == '.' || c == ' ');
    if stem.is_empty() {
        format!("{}{}", FALLBACK_NAME, ext)
    } else {
        format!("{}{}", stem, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_forbidden_chars() {
        assert_eq!(
            sanitize_file_name("Rechnung: 2023/04 <final>?.pdf"),
            "Rechnung 202304 final.pdf"
        );
    }

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(sanitize_file_name("  ..a \t  b\n c.txt. "), "a b c.txt");
    }

    #[test]
    fn test_nfc_normalization() {
        // "u" + combining diaeresis
        let decomposed = "Gebu\u{0308}hr.pdf";
        assert_eq!(sanitize_file_name(decomposed), "Geb\u{00fc}hr.pdf");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(sanitize_file_name("///"), FALLBACK_NAME);
        assert_eq!(sanitize_file_name(""), FALLBACK_NAME);
    }

    #[test]
    fn test_long_name_keeps_extension() {
        let name = format!("{}.pdf", "\u{00e4}".repeat(200));
        let sanitized = sanitize_file_name(&name);
        assert!(sanitized.len() <= MAX_NAME_BYTES);
        assert!(sanitized.ends_with(".pdf"));
        assert!(sanitized.is_char_boundary(sanitized.len() - 4));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.final.pdf"), ("report.final", ".pdf"));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension("trailing."), ("trailing.", ""));
    }
}
