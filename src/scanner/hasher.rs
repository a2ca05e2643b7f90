//! BLAKE3 content hasher with streaming support.
//!
//! # Overview
//!
//! This module provides the [`Hasher`] struct for computing BLAKE3 hashes
//! of file contents. Hashes depend only on the raw bytes: two files with
//! identical content produce the same digest regardless of name, path, or
//! other metadata.
//!
//! # Example
//!
//! ```
//! use dupescout::scanner::{hash_to_hex, Hasher};
//!
//! let hasher = Hasher::new();
//! let hash = hasher.hash_bytes(b"hello world");
//! assert_eq!(hash_to_hex(&hash).len(), 64);
//! ```

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use super::{ContentSource, HashError};

/// A 32-byte BLAKE3 content hash.
pub type Hash = [u8; 32];

/// Read buffer size for streaming file hashes.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Convert a hash to its lowercase hexadecimal representation (64 chars).
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use std::fmt::Write;

    let mut hex = String::with_capacity(64);
    for byte in hash {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Parse a 64-character hexadecimal string back into a hash.
///
/// Returns `None` if the string has the wrong length or contains
/// non-hexadecimal characters.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).ok()?;
        hash[i] = u8::from_str_radix(s, 16).ok()?;
    }
    Some(hash)
}

/// Content hasher backed by BLAKE3.
///
/// The hasher is stateless and cheap to share behind an `Arc` across
/// worker threads.
#[derive(Debug, Default)]
pub struct Hasher {
    _private: (),
}

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash an in-memory byte buffer.
    #[must_use]
    pub fn hash_bytes(&self, bytes: &[u8]) -> Hash {
        *blake3::hash(bytes).as_bytes()
    }

    /// Hash a file's entire content by streaming it from disk.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read. Callers
    /// are expected to report the failure per file and continue with the
    /// rest of the batch.
    pub fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| Self::io_error(path, e))?;
        let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
        let mut hasher = blake3::Hasher::new();
        io::copy(&mut reader, &mut hasher).map_err(|e| Self::io_error(path, e))?;
        Ok(*hasher.finalize().as_bytes())
    }

    /// Hash the content behind a [`ContentSource`].
    ///
    /// On-disk sources are streamed; buffered sources are hashed in place.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if an on-disk source cannot be read.
    pub fn hash_source(&self, source: &ContentSource) -> Result<Hash, HashError> {
        match source {
            ContentSource::Path(path) => self.hash_file(path),
            ContentSource::Bytes(bytes) => Ok(self.hash_bytes(bytes)),
        }
    }

    fn io_error(path: &Path, e: io::Error) -> HashError {
        match e.kind() {
            io::ErrorKind::NotFound => HashError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => HashError::PermissionDenied(path.to_path_buf()),
            _ => HashError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}
