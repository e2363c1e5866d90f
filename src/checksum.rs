//! SHA-256 content hashing for duplicate detection.

use crate::error::{ArchiveError, Result};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Buffer size for reading files (64KB)
const BUFFER_SIZE: usize = 64 * 1024;

/// 256-bit content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(digest);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Digest of one file, computed per run and never persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDigest {
    pub hash: ContentHash,
    pub path: PathBuf,
    pub size: u64,
}

/// Compute the SHA-256 digest of a file's bytes, streaming in chunks
pub fn compute_file_digest(path: &Path) -> Result<FileDigest> {
    let file = File::open(path).map_err(|e| ArchiveError::io("open", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| ArchiveError::io("stat", path, e))?
        .len();

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| ArchiveError::io("read", path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(FileDigest {
        hash: ContentHash::from_digest(&hasher.finalize()),
        path: path.to_path_buf(),
        size,
    })
}

/// Hash an in-memory buffer
#[cfg(test)]
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash::from_digest(&Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_compute_file_digest() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let digest = compute_file_digest(&file_path).unwrap();

        assert_eq!(digest.size, 13);
        assert_eq!(digest.hash, hash_bytes(b"Hello, World!"));
        assert_eq!(
            digest.hash.to_hex(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[test]
    fn test_digest_spans_buffer_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("big.bin");
        let data = vec![7u8; BUFFER_SIZE * 2 + 11];
        std::fs::write(&file_path, &data).unwrap();

        let digest = compute_file_digest(&file_path).unwrap();
        assert_eq!(digest.hash, hash_bytes(&data));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = compute_file_digest(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
    }
}
