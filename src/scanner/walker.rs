//! Directory traversal producing file descriptors.
//!
//! The walker turns a directory tree into the ordered descriptor
//! collection the pipeline consumes. Traversal is sorted by file name at
//! every level, so discovery order (and everything derived from it:
//! group membership order, tie-breaking) is reproducible across runs.
//!
//! Per-entry failures (unreadable subdirectory, vanished file) are
//! collected and reported; they never abort the walk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use walkdir::WalkDir;

use super::{ContentSource, FileDescriptor, ScanError};

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: may loop forever on symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,
}

/// Directory walker producing [`FileDescriptor`]s in deterministic order.
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
    version_re: Regex,
}

impl Walker {
    /// Create a new walker rooted at `root`.
    #[must_use]
    pub fn new(root: &Path, config: WalkerConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            // Dotted numeric sequences like "2.1" or "v1.0.3" in file names.
            version_re: Regex::new(r"v?(\d+(?:\.\d+)+)").expect("valid version pattern"),
        }
    }

    /// Walk the root directory and collect descriptors.
    ///
    /// Returns the descriptors in sorted traversal order together with the
    /// per-entry errors encountered along the way.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] only if the root itself is missing or not a
    /// directory; everything below the root degrades to per-entry errors.
    pub fn collect_descriptors(&self) -> Result<(Vec<FileDescriptor>, Vec<ScanError>), ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let mut descriptors = Vec::new();
        let mut errors = Vec::new();

        let walk = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                    errors.push(match e.io_error().map(std::io::Error::kind) {
                        Some(std::io::ErrorKind::PermissionDenied) => {
                            ScanError::PermissionDenied(path)
                        }
                        _ => ScanError::Io {
                            path,
                            source: e.into(),
                        },
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if self.config.skip_hidden && is_hidden(entry.path(), &self.root) {
                log::trace!("Skipping hidden file {}", entry.path().display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Failed to stat {}: {}", entry.path().display(), e);
                    errors.push(ScanError::Io {
                        path: entry.path().to_path_buf(),
                        source: e.into(),
                    });
                    continue;
                }
            };

            let size = metadata.len();
            if self.config.min_size.is_some_and(|min| size < min)
                || self.config.max_size.is_some_and(|max| size > max)
            {
                log::trace!("Size filter excluded {}", entry.path().display());
                continue;
            }

            let last_modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();

            let mime_type = mime_type_for(entry.path());
            let version = self.extract_version(&name);

            descriptors.push(FileDescriptor {
                name,
                path: relative,
                mime_type,
                size,
                last_modified,
                version,
                source: ContentSource::Path(entry.path().to_path_buf()),
            });
        }

        log::info!(
            "Discovered {} files under {} ({} entries skipped with errors)",
            descriptors.len(),
            self.root.display(),
            errors.len()
        );

        Ok((descriptors, errors))
    }

    /// Extract a dotted version string from a file name, if present.
    #[must_use]
    pub fn extract_version(&self, name: &str) -> Option<String> {
        self.version_re
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Check whether any component of `path` below `root` is hidden.
fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Guess the MIME type for a path from its extension.
#[must_use]
pub fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
