//! Best-effort text recovery from Pages `Index/Document.iwa` streams.
//!
//! The stream is a sequence of frames: a 1-byte type tag, a 3-byte
//! little-endian length, then `length` payload bytes. Payloads are
//! concatenated and scanned for runs of printable characters. There is no
//! schema decoding here: the result is lossy and the filter thresholds
//! below are tuning knobs, not a format contract.
//!
//! Every read goes through [`ByteCursor`], which refuses to move past the
//! end of its buffer, so arbitrary input cannot cause a panic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shortest printable run kept as text
pub const MIN_RUN_CHARS: usize = 8;

/// All-caps/digit/underscore tokens this long are internal symbol names
pub const MIN_SYMBOL_CHARS: usize = 20;

static PRINTABLE_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"[\x20-\x7E\u{{00C0}}-\u{{024F}}]{{{},}}",
        MIN_RUN_CHARS
    ))
    .expect("Invalid regex")
});

static REPEATED_I: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[iI]+$").expect("Invalid regex"));

/// Complete UUIDs anywhere inside a run
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}")
        .expect("Invalid regex")
});

/// A run that is nothing but a cut-off UUID
static UUID_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}[0-9A-Fa-f-]*$").expect("Invalid regex")
});

static SYMBOL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^[A-Z0-9_]{{{},}}$", MIN_SYMBOL_CHARS)).expect("Invalid regex")
});

/// Forward-only reader over a byte slice; every read is bounds-checked
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    pub fn read_u24_le(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(3)?;
        Some(u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16)
    }

    /// Take `len` bytes, or nothing if fewer remain
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }
}

/// Concatenate the payloads of all complete frames.
///
/// Stops at the first frame whose header or declared length runs past the
/// end of the buffer and returns what was collected before it.
pub fn decode_frames(bytes: &[u8]) -> Vec<u8> {
    let mut cursor = ByteCursor::new(bytes);
    let mut payload = Vec::with_capacity(bytes.len());
    let mut frames = 0usize;

    while !cursor.is_empty() {
        let frame_start = cursor.position();
        let Some(_tag) = cursor.read_u8() else { break };
        let Some(length) = cursor.read_u24_le() else {
            tracing::debug!("[Iwa] Truncated frame header at offset {}", frame_start);
            break;
        };
        let Some(data) = cursor.read_bytes(length as usize) else {
            tracing::debug!(
                "[Iwa] Frame at offset {} declares {} bytes, only {} remain",
                frame_start,
                length,
                cursor.remaining()
            );
            break;
        };
        payload.extend_from_slice(data);
        frames += 1;
    }

    tracing::debug!("[Iwa] Decoded {} frame(s), {} payload bytes", frames, payload.len());
    payload
}

/// Printable runs from a raw payload, spurious tokens filtered out
pub fn recover_text(raw: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(raw);
    PRINTABLE_RUNS
        .find_iter(&decoded)
        .flat_map(|m| UUID.split(m.as_str()))
        .map(str::trim)
        .filter(|run| run.chars().count() >= MIN_RUN_CHARS && !is_spurious(run))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_spurious(run: &str) -> bool {
    REPEATED_I.is_match(run) || UUID_FRAGMENT.is_match(run) || SYMBOL_NAME.is_match(run)
}

/// Recover document text from an IWA byte stream
pub fn parse_iwa(bytes: &[u8]) -> String {
    recover_text(&decode_frames(bytes))
}
