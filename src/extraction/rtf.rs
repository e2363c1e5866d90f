//! Minimal RTF reader: strips control words and groups, keeps body text.

use super::cascade::{Attempt, StepContext};
use super::text::{finish_native, latin1_to_string};
use encoding_rs::WINDOWS_1252;

/// Destinations whose content is never document text
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "footer",
    "headerl",
    "headerr",
    "footerl",
    "footerr",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
    "filetbl",
    "revtbl",
    "themedata",
    "colorschememapping",
    "latentstyles",
    "datastore",
    "xmlnstbl",
];

pub(crate) fn extract_rtf(ctx: &StepContext<'_>) -> Attempt {
    let bytes = match std::fs::read(ctx.path) {
        Ok(bytes) => bytes,
        Err(e) => return Attempt::Failed(format!("Failed to read RTF file: {}", e)),
    };

    if !bytes.starts_with(b"{\\rtf") {
        return Attempt::Failed("missing {\\rtf header".to_string());
    }

    // RTF is 7-bit; anything above is decoded byte-for-byte
    let text = finish_native(&rtf_to_text(&latin1_to_string(&bytes)));
    if text.is_empty() {
        return Attempt::Insufficient {
            text,
            reason: "RTF has no text".to_string(),
        };
    }
    Attempt::extracted(text)
}

#[derive(Clone, Copy)]
struct GroupState {
    skip: bool,
    /// Fallback characters following each `\uN`
    unicode_skip: usize,
}

/// Convert RTF markup to plain text
pub(crate) fn rtf_to_text(rtf: &str) -> String {
    let mut out = String::with_capacity(rtf.len() / 2);
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState {
        skip: false,
        unicode_skip: 1,
    };
    // Fallback characters still to drop after a `\uN`
    let mut pending_fallback = 0usize;

    let mut chars = rtf.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                stack.push(state);
                pending_fallback = 0;
            }
            '}' => {
                state = stack.pop().unwrap_or(state);
                pending_fallback = 0;
            }
            '\\' => {
                let Some(&next) = chars.peek() else { break };
                match next {
                    '\\' | '{' | '}' => {
                        chars.next();
                        emit(&mut out, &state, &mut pending_fallback, next);
                    }
                    '\'' => {
                        chars.next();
                        let hex: String = chars.by_ref().take(2).collect();
                        if hex.len() < 2 {
                            break;
                        }
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            emit(&mut out, &state, &mut pending_fallback, ansi_char(byte));
                        }
                    }
                    '*' => {
                        chars.next();
                        state.skip = true;
                    }
                    '~' => {
                        chars.next();
                        emit(&mut out, &state, &mut pending_fallback, ' ');
                    }
                    '_' => {
                        chars.next();
                        emit(&mut out, &state, &mut pending_fallback, '-');
                    }
                    '\n' | '\r' => {
                        chars.next();
                        if !state.skip {
                            out.push('\n');
                        }
                    }
                    c if c.is_ascii_alphabetic() => {
                        let mut word = String::new();
                        while let Some(&c) = chars.peek() {
                            if c.is_ascii_alphabetic() {
                                word.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }

                        let mut param = String::new();
                        if chars.peek() == Some(&'-') {
                            param.push('-');
                            chars.next();
                        }
                        while let Some(&c) = chars.peek() {
                            if c.is_ascii_digit() {
                                param.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        let param: Option<i32> = param.parse().ok();

                        // A single space delimits the control word
                        if chars.peek() == Some(&' ') {
                            chars.next();
                        }

                        control_word(&word, param, &mut state, &mut out, &mut pending_fallback);
                    }
                    _ => {
                        // Other control symbols (\-, \|, \:) carry no text
                        chars.next();
                    }
                }
            }
            '\r' | '\n' => {}
            c => emit(&mut out, &state, &mut pending_fallback, c),
        }
    }

    out
}

fn emit(out: &mut String, state: &GroupState, pending_fallback: &mut usize, c: char) {
    if *pending_fallback > 0 {
        *pending_fallback -= 1;
        return;
    }
    if !state.skip {
        out.push(c);
    }
}

fn control_word(
    word: &str,
    param: Option<i32>,
    state: &mut GroupState,
    out: &mut String,
    pending_fallback: &mut usize,
) {
    if SKIPPED_DESTINATIONS.contains(&word) {
        state.skip = true;
        return;
    }
    if state.skip {
        return;
    }

    match word {
        "par" | "line" | "sect" | "page" | "row" => out.push('\n'),
        "tab" => out.push('\t'),
        "cell" => out.push(' '),
        "emdash" => out.push('\u{2014}'),
        "endash" => out.push('\u{2013}'),
        "bullet" => out.push('\u{2022}'),
        "lquote" => out.push('\u{2018}'),
        "rquote" => out.push('\u{2019}'),
        "ldblquote" => out.push('\u{201C}'),
        "rdblquote" => out.push('\u{201D}'),
        "uc" => state.unicode_skip = param.unwrap_or(1).max(0) as usize,
        "u" => {
            if let Some(value) = param {
                // Values above 32767 are written as negative numbers
                let code = if value < 0 { value + 65_536 } else { value };
                if let Some(c) = char::from_u32(code as u32) {
                    out.push(c);
                }
                *pending_fallback = state.unicode_skip;
            }
        }
        _ => {}
    }
}

/// `\'hh` escapes are code page 1252 bytes
fn ansi_char(byte: u8) -> char {
    WINDOWS_1252
        .decode_without_bom_handling(&[byte])
        .0
        .chars()
        .next()
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
