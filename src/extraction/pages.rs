//! Apple Pages documents.
//!
//! A `.pages` file is either a zip archive or (older releases) a package
//! directory. Text sources are tried in order: legacy `index.xml`, the IWA
//! stream in `Index/Document.iwa`, then the QuickLook preview PDF.

use super::cascade::{Attempt, StepContext};
use super::iwa::parse_iwa;
use super::pdf::text_from_bytes;
use super::text::{finish_native, read_bounded};
use super::xml::xml_to_text;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const INDEX_XML: &str = "index.xml";
const DOCUMENT_IWA: &str = "Index/Document.iwa";
const PREVIEW_PDF: &str = "QuickLook/Preview.pdf";
/// Package directories keep the IWA streams in a nested archive
const INDEX_ZIP: &str = "Index.zip";

enum Container {
    Zip(ZipArchive<File>),
    Package(PathBuf),
}

impl Container {
    fn open(path: &Path) -> Result<Self, String> {
        if path.is_dir() {
            return Ok(Container::Package(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| format!("Failed to open Pages file: {}", e))?;
        ZipArchive::new(file)
            .map(Container::Zip)
            .map_err(|e| format!("Pages file is not a zip archive: {}", e))
    }

    /// Bytes of a member, at most `limit` of them.
    ///
    /// `None` if absent or unreadable.
    fn read(&mut self, name: &str, limit: u64) -> Option<Member> {
        match self {
            Container::Zip(archive) => read_zip_entry(archive, name, limit),
            Container::Package(dir) => {
                let direct = dir.join(name);
                if direct.is_file() {
                    return read_member(File::open(&direct).ok()?, name, limit);
                }
                if name == DOCUMENT_IWA {
                    let nested_file = File::open(dir.join(INDEX_ZIP)).ok()?;
                    let nested = read_member(nested_file, INDEX_ZIP, limit)?;
                    if nested.truncated {
                        tracing::warn!("[Extractor] {} exceeds {} bytes", INDEX_ZIP, limit);
                        return None;
                    }
                    let mut archive = ZipArchive::new(Cursor::new(nested.bytes)).ok()?;
                    return read_zip_entry(&mut archive, name, limit);
                }
                None
            }
        }
    }
}

struct Member {
    bytes: Vec<u8>,
    /// Member was larger than the read limit
    truncated: bool,
}

impl Member {
    fn note_truncation(&self, name: &str, limit: u64, warnings: &mut Vec<String>) {
        if self.truncated {
            warnings.push(format!("{} exceeds {} bytes, only the start was read", name, limit));
        }
    }
}

fn read_member<R: Read>(reader: R, name: &str, limit: u64) -> Option<Member> {
    match read_bounded(reader, limit) {
        Ok((bytes, truncated)) => Some(Member { bytes, truncated }),
        Err(e) => {
            tracing::debug!("[Extractor] Failed to read Pages member {}: {}", name, e);
            None
        }
    }
}

fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    limit: u64,
) -> Option<Member> {
    let entry = archive.by_name(name).ok()?;
    read_member(entry, name, limit)
}

pub(crate) fn extract_pages(ctx: &StepContext<'_>) -> Attempt {
    let mut container = match Container::open(ctx.path) {
        Ok(container) => container,
        Err(e) => return Attempt::Failed(e),
    };

    let limit = ctx.config.max_file_size_bytes;
    let mut warnings = Vec::new();

    match container.read(INDEX_XML, limit) {
        Some(member) => {
            member.note_truncation(INDEX_XML, limit, &mut warnings);
            let text = finish_native(&xml_to_text(&String::from_utf8_lossy(&member.bytes)));
            if !text.is_empty() {
                tracing::debug!("[Extractor] Pages text from {}", INDEX_XML);
                return Attempt::Extracted { text, warnings };
            }
            warnings.push(format!("{} contains no text", INDEX_XML));
        }
        None => tracing::debug!("[Extractor] No {} in {}", INDEX_XML, ctx.path.display()),
    }

    match container.read(DOCUMENT_IWA, limit) {
        Some(member) => {
            member.note_truncation(DOCUMENT_IWA, limit, &mut warnings);
            let text = finish_native(&parse_iwa(&member.bytes));
            if !text.is_empty() {
                tracing::debug!(
                    "[Extractor] Pages text recovered from IWA ({} bytes)",
                    member.bytes.len()
                );
                warnings.push("Text recovered heuristically from IWA stream".to_string());
                return Attempt::Extracted { text, warnings };
            }
            warnings.push(format!("{} yielded no text", DOCUMENT_IWA));
        }
        None => tracing::debug!("[Extractor] No {} in {}", DOCUMENT_IWA, ctx.path.display()),
    }

    match container.read(PREVIEW_PDF, limit) {
        Some(member) if member.truncated => {
            member.note_truncation(PREVIEW_PDF, limit, &mut warnings);
        }
        Some(member) => match text_from_bytes(&member.bytes) {
            Ok(text) if !text.is_empty() => {
                warnings.push("Text taken from QuickLook preview".to_string());
                return Attempt::Extracted { text, warnings };
            }
            Ok(_) => warnings.push(format!("{} has no text layer", PREVIEW_PDF)),
            Err(e) => warnings.push(format!("{}: {}", PREVIEW_PDF, e)),
        },
        None => tracing::debug!("[Extractor] No {} in {}", PREVIEW_PDF, ctx.path.display()),
    }

    warnings.push("No text source found in Pages document".to_string());
    Attempt::Insufficient {
        text: String::new(),
        reason: warnings.join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extraction::SourceFormat;
    use crate::ocr::{OcrEngine, OcrError};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    struct NoOcr;

    impl OcrEngine for NoOcr {
        fn recognize(&self, _input: &Path, _multi_page: bool) -> Result<String, OcrError> {
            Err(OcrError::NoPages)
        }
    }

    fn run(path: &Path) -> Attempt {
        run_with(path, &Config::default())
    }

    fn run_with(path: &Path, config: &Config) -> Attempt {
        let ctx = StepContext {
            path,
            format: SourceFormat::Pages,
            config,
            ocr: &NoOcr,
        };
        extract_pages(&ctx)
    }

    fn write_zip(path: &Path, members: &[(&str, Vec<u8>)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, bytes) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap();
    }

    fn iwa_frame(payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u32;
        let mut out = vec![0, len as u8, (len >> 8) as u8, (len >> 16) as u8];
        out.extend_from_slice(payload);
        out
    }

    fn text_of(attempt: Attempt) -> String {
        match attempt {
            Attempt::Extracted { text, .. } => text,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_index_xml_preferred() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alt.pages");
        write_zip(
            &path,
            &[
                (INDEX_XML, b"<sf:p>Alte Pages Datei</sf:p>".to_vec()),
                (DOCUMENT_IWA, iwa_frame(b"Should not be used")),
            ],
        );
        assert_eq!(text_of(run(&path)), "Alte Pages Datei");
    }

    #[test]
    fn test_iwa_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neu.pages");
        write_zip(
            &path,
            &[(DOCUMENT_IWA, iwa_frame(b"\x0a\x12Rechnung vom Handwerker\x00"))],
        );
        assert_eq!(text_of(run(&path)), "Rechnung vom Handwerker");
    }

    #[test]
    fn test_oversized_member_is_read_partially() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("riesig.pages");
        let stream: Vec<u8> = (0..100)
            .flat_map(|_| iwa_frame(b"Mietvertrag Wohnung "))
            .collect();
        write_zip(&path, &[(DOCUMENT_IWA, stream)]);

        let config = Config {
            max_file_size_bytes: 60,
            ..Config::default()
        };
        match run_with(&path, &config) {
            Attempt::Extracted { text, warnings } => {
                assert_eq!(text, "Mietvertrag Wohnung Mietvertrag Wohnung");
                assert!(warnings.iter().any(|w| w.contains("exceeds 60 bytes")));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_package_directory_with_nested_index_zip() {
        let dir = TempDir::new().unwrap();
        let package = dir.path().join("paket.pages");
        std::fs::create_dir_all(&package).unwrap();
        write_zip(
            &package.join(INDEX_ZIP),
            &[(DOCUMENT_IWA, iwa_frame(b"Text aus dem Paketordner"))],
        );
        assert_eq!(text_of(run(&package)), "Text aus dem Paketordner");
    }

    #[test]
    fn test_not_a_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kaputt.pages");
        std::fs::write(&path, b"garbage").unwrap();
        assert!(matches!(run(&path), Attempt::Failed(_)));
    }

    #[test]
    fn test_nothing_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leer.pages");
        write_zip(&path, &[("Metadata/Properties.plist", b"x".to_vec())]);
        match run(&path) {
            Attempt::Insufficient { text, .. } => assert!(text.is_empty()),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
