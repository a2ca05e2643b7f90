//! File ingestion: descriptors, records, and content hashing.
//!
//! This module provides the input side of the pipeline:
//! - [`FileDescriptor`]: what callers hand to the scan (name, path, size,
//!   MIME type, timestamp, and a way to obtain raw bytes)
//! - [`FileRecord`]: the immutable, content-addressed record built during
//!   ingestion
//! - [`hasher`]: BLAKE3 content hashing
//! - [`walker`]: directory traversal that produces descriptors
//!
//! The pipeline does not care where content comes from: a descriptor can
//! point at a file on disk or carry an already-buffered upload.
//!
//! # Example
//!
//! ```no_run
//! use dupescout::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let (descriptors, errors) = walker.collect_descriptors().unwrap();
//! for d in &descriptors {
//!     println!("{}: {} bytes ({})", d.path.display(), d.size, d.mime_type);
//! }
//! for e in &errors {
//!     eprintln!("warning: {e}");
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Category;

// Re-export main types
pub use hasher::{hash_to_hex, hex_to_hash, Hash, Hasher};
pub use walker::{Walker, WalkerConfig};

/// Stable identity of a file within one scan.
///
/// Ids are assigned in ingestion order and never reused within a scan, so
/// they stay valid across group mutations and session bookkeeping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file-{}", self.0)
    }
}

/// Where a descriptor's raw bytes come from.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Content is read (streamed) from a file on disk.
    Path(PathBuf),
    /// Content is already buffered in memory (e.g. an uploaded transfer).
    Bytes(Vec<u8>),
}

/// An input file as handed to the pipeline, before hashing.
///
/// Descriptors form an ordered collection; their order defines discovery
/// order everywhere downstream (group membership order, tie-breaking).
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// File name (no directory components).
    pub name: String,
    /// Path relative to the scan root.
    pub path: PathBuf,
    /// MIME type, e.g. `application/pdf`.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Version string extracted from the file name, if any.
    pub version: Option<String>,
    /// Where to obtain the raw bytes.
    pub source: ContentSource,
}

impl FileDescriptor {
    /// Create a descriptor for already-buffered content.
    ///
    /// The size is taken from the buffer length.
    #[must_use]
    pub fn from_bytes(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        last_modified: DateTime<Utc>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            last_modified,
            version: None,
            source: ContentSource::Bytes(bytes),
        }
    }

    /// Attach a version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// An ingested file with its content fingerprint.
///
/// Records are immutable after creation: the hash is computed exactly once
/// from the descriptor's bytes. The only later assignment is the category
/// (set once by the resolver); the session-local deleted flag lives in
/// [`crate::session::CleanupSession`], not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Stable per-scan identity.
    pub id: FileId,
    /// File name.
    pub name: String,
    /// Path relative to the scan root.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// BLAKE3 content hash (32 bytes).
    pub content_hash: Hash,
    /// Semantic category, `Other` until the resolver assigns one.
    #[serde(default)]
    pub category: Category,
    /// Resolver confidence for the category, 0.0 when unclassified.
    #[serde(default)]
    pub category_confidence: f64,
    /// Version string, if one was detected.
    pub version: Option<String>,
}

impl FileRecord {
    /// Build a record from a descriptor and its computed hash.
    #[must_use]
    pub fn from_descriptor(id: FileId, descriptor: &FileDescriptor, content_hash: Hash) -> Self {
        Self {
            id,
            name: descriptor.name.clone(),
            path: descriptor.path.clone(),
            size: descriptor.size,
            mime_type: descriptor.mime_type.clone(),
            last_modified: descriptor.last_modified,
            content_hash,
            category: Category::Other,
            category_confidence: 0.0,
            version: descriptor.version.clone(),
        }
    }

    /// Content hash as a hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hash_to_hex(&self.content_hash)
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while hashing content.
///
/// These are per-file failures: the affected file is excluded from
/// grouping and reported in the scan summary, never fatal to the scan.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
