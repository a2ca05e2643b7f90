//! Semantic file categorization via an external classifier.
//!
//! # Overview
//!
//! Categorization is delegated to a black-box classification service
//! behind the [`Classifier`] trait. The core never trusts the collaborator:
//! responses are validated against the closed [`Category`] set, confidence
//! values are clamped to `[0, 1]`, and files the service failed to answer
//! for fall back to [`Category::Other`] with confidence 0.
//!
//! [`CategoryResolver`] wraps a classifier with a timeout. A timed-out or
//! failed call degrades the whole batch to the default category and the
//! scan continues; the failure is surfaced as a warning, never as a fatal
//! error.
//!
//! Responses are matched back to inputs by [`FileId`]. Matching by file
//! name would conflate same-named files in different groups, so the stable
//! id is the join key; the name travels along for the human-facing wire
//! shape only.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scanner::FileId;

/// Closed set of semantic file categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    /// Games and game installers.
    Games,
    /// Office and productivity documents.
    Productivity,
    /// Source code and developer tooling.
    Development,
    /// Web browsers and their installers.
    Browsers,
    /// Audio and video.
    Media,
    /// Images and design assets.
    Graphics,
    /// Security tooling.
    Security,
    /// Operating system utilities.
    #[serde(rename = "System Tools")]
    SystemTools,
    /// Everything else; also the fallback for unknown classifier output.
    #[default]
    Other,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 9] = [
        Category::Games,
        Category::Productivity,
        Category::Development,
        Category::Browsers,
        Category::Media,
        Category::Graphics,
        Category::Security,
        Category::SystemTools,
        Category::Other,
    ];

    /// Canonical display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Games => "Games",
            Category::Productivity => "Productivity",
            Category::Development => "Development",
            Category::Browsers => "Browsers",
            Category::Media => "Media",
            Category::Graphics => "Graphics",
            Category::Security => "Security",
            Category::SystemTools => "System Tools",
            Category::Other => "Other",
        }
    }

    /// Parse a category name as returned by a classifier.
    ///
    /// Matching is case-insensitive; anything outside the closed set maps
    /// to [`Category::Other`] rather than being trusted.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_ascii_lowercase() == normalized)
            .unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file in a classification request batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Stable id used to join the response back to the file.
    pub file_id: FileId,
    /// File name.
    pub file_name: String,
    /// MIME type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Path relative to the scan root.
    pub file_path: String,
}

/// One classifier answer.
///
/// The category arrives as a free string and is validated by the resolver;
/// the optional reasoning is explanation text only and is never parsed for
/// decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    /// Id of the file this answer is for.
    pub file_id: FileId,
    /// Predicted category name.
    pub category: String,
    /// Confidence in the prediction; clamped to [0, 1] by the resolver.
    pub confidence: f64,
    /// Optional short rationale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Errors from the classification collaborator.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ClassifierError {
    /// The service failed or is unreachable.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// The service did not answer within the configured timeout.
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability interface for the external classification service.
pub trait Classifier: Send + Sync {
    /// Classify a batch of files.
    ///
    /// Implementations may answer for a subset of the batch; the resolver
    /// fills the gaps with [`Category::Other`].
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] when the batch as a whole cannot be
    /// answered.
    fn classify(&self, batch: &[ClassifyRequest]) -> Result<Vec<ClassifyResponse>, ClassifierError>;
}

/// A validated category assignment for one file.
#[derive(Debug, Clone)]
pub struct ResolvedCategory {
    /// The validated category.
    pub category: Category,
    /// Clamped confidence.
    pub confidence: f64,
    /// Explanation text, if the classifier provided one.
    pub reasoning: Option<String>,
}

/// Timeout-guarded front end over a [`Classifier`].
///
/// The classifier call runs on a worker thread; if it does not answer
/// within the timeout the resolver reports
/// [`ClassifierError::Timeout`] and the caller degrades to default
/// categories. The straggler thread is left to finish in the background
/// (its late answer is dropped).
pub struct CategoryResolver {
    classifier: Arc<dyn Classifier>,
    timeout: Duration,
}

impl CategoryResolver {
    /// Create a resolver with the given timeout.
    #[must_use]
    pub fn new(classifier: Arc<dyn Classifier>, timeout: Duration) -> Self {
        Self {
            classifier,
            timeout,
        }
    }

    /// Classify a batch, validating every answer.
    ///
    /// Returns a map from file id to validated category. Files missing
    /// from the map fell outside the classifier's answer and default to
    /// `Other` at the call site.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] on service failure or timeout. Callers
    /// must treat this as degraded mode, not as a fatal error.
    pub fn resolve(
        &self,
        batch: Vec<ClassifyRequest>,
    ) -> Result<HashMap<FileId, ResolvedCategory>, ClassifierError> {
        if batch.is_empty() {
            return Ok(HashMap::new());
        }

        let (tx, rx) = mpsc::channel();
        let classifier = Arc::clone(&self.classifier);
        thread::spawn(move || {
            let result = classifier.classify(&batch);
            // Receiver may be gone after a timeout; the late answer is dropped.
            let _ = tx.send(result);
        });

        let responses = match rx.recv_timeout(self.timeout) {
            Ok(Ok(responses)) => responses,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                log::warn!(
                    "Classifier did not answer within {:?}, degrading batch",
                    self.timeout
                );
                return Err(ClassifierError::Timeout(self.timeout));
            }
        };

        let mut resolved = HashMap::with_capacity(responses.len());
        for response in responses {
            let category = Category::parse(&response.category);
            if category == Category::Other && response.category.trim() != "Other" {
                log::debug!(
                    "Unknown category {:?} for {}, mapped to Other",
                    response.category,
                    response.file_id
                );
            }
            let confidence = response.confidence.clamp(0.0, 1.0);
            // First answer per id wins; duplicates are classifier noise.
            resolved.entry(response.file_id).or_insert(ResolvedCategory {
                category,
                confidence,
                reasoning: response.reasoning,
            });
        }
        Ok(resolved)
    }
}

/// Deterministic rule-based classifier.
///
/// Maps MIME types and file-name keywords onto the closed category set.
/// Useful as an offline default and in tests; a remote model-backed
/// implementation plugs in through the same [`Classifier`] trait.
#[derive(Debug, Default)]
pub struct RuleBasedClassifier {
    _private: (),
}

impl RuleBasedClassifier {
    /// Create a new rule-based classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn categorize(request: &ClassifyRequest) -> (Category, f64) {
        let name = request.file_name.to_ascii_lowercase();
        let mime = request.file_type.to_ascii_lowercase();

        // Name keywords outrank the MIME major type: an installer named
        // "firefox-setup.exe" is a browser, not a generic executable.
        const BROWSERS: [&str; 5] = ["firefox", "chrome", "chromium", "edge", "opera"];
        const GAMES: [&str; 4] = ["game", "steam", "unity", "unreal"];
        const SECURITY: [&str; 4] = ["antivirus", "defender", "vpn", "keepass"];
        if BROWSERS.iter().any(|k| name.contains(k)) {
            return (Category::Browsers, 0.8);
        }
        if GAMES.iter().any(|k| name.contains(k)) {
            return (Category::Games, 0.7);
        }
        if SECURITY.iter().any(|k| name.contains(k)) {
            return (Category::Security, 0.7);
        }

        if mime.starts_with("image/") {
            return (Category::Graphics, 0.9);
        }
        if mime.starts_with("audio/") || mime.starts_with("video/") {
            return (Category::Media, 0.9);
        }
        if mime.starts_with("text/x-")
            || matches!(
                mime.as_str(),
                "application/json" | "application/toml" | "application/x-sh"
            )
        {
            return (Category::Development, 0.8);
        }
        if matches!(
            mime.as_str(),
            "application/pdf"
                | "application/msword"
                | "application/vnd.ms-excel"
                | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        ) {
            return (Category::Productivity, 0.85);
        }
        if matches!(
            mime.as_str(),
            "application/x-msdownload" | "application/x-ms-installer" | "application/x-apple-diskimage"
        ) {
            return (Category::SystemTools, 0.5);
        }

        (Category::Other, 0.3)
    }
}

impl Classifier for RuleBasedClassifier {
    fn classify(&self, batch: &[ClassifyRequest]) -> Result<Vec<ClassifyResponse>, ClassifierError> {
        Ok(batch
            .iter()
            .map(|request| {
                let (category, confidence) = Self::categorize(request);
                ClassifyResponse {
                    file_id: request.file_id,
                    category: category.as_str().to_string(),
                    confidence,
                    reasoning: None,
                }
            })
            .collect())
    }
}
