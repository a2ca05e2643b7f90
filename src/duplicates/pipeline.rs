//! Scan pipeline: hash fan-out, grouping barrier, batched classification.
//!
//! # Overview
//!
//! [`ScanPipeline`] runs the full detection sequence over an ordered
//! descriptor collection:
//!
//! 1. **Hashing** — embarrassingly parallel per file, fanned out on a
//!    rayon pool bounded by `io_threads`. Per-file read failures are
//!    collected, reported in the summary, and never abort the batch.
//! 2. **Grouping** — a single sequential reduction over all hash results;
//!    the natural synchronization barrier before the per-group work.
//! 3. **Classification** — one batched call to the category resolver,
//!    guarded by a timeout. Failure or expiry degrades the batch to
//!    [`Category::Other`](crate::classify::Category) and records a
//!    warning; the scan still completes.
//!
//! A shared shutdown flag is checked between stages: an interrupted scan
//! returns [`PipelineError::Interrupted`] and partial results are
//! discarded, never half-applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{CategoryResolver, ClassifyRequest};
use crate::progress::ProgressCallback;
use crate::scanner::{FileDescriptor, FileId, FileRecord, HashError, Hasher};

use super::groups::{group_by_hash, DuplicateGroup, GroupingStats};

/// Configuration for the scan pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Number of worker threads for parallel hashing.
    /// Bounded to avoid disk thrashing and file-handle exhaustion.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful cancellation between stages.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl PipelineConfig {
    /// Set the worker thread count for hashing.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful cancellation.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// A file excluded from grouping because its content was unreadable.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    /// Path of the file that failed.
    pub path: std::path::PathBuf,
    /// Human-readable error description.
    pub error: String,
}

/// Summary statistics for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of descriptors ingested.
    pub total_files: usize,
    /// Total size of all ingested files in bytes.
    pub total_size: u64,
    /// Number of files successfully hashed.
    pub hashed_files: usize,
    /// Files excluded because their content could not be read.
    pub skipped: Vec<SkippedFile>,
    /// Number of duplicate groups found.
    pub duplicate_groups: usize,
    /// Number of files inside duplicate groups (all copies).
    pub duplicate_files: usize,
    /// Space occupied by all copies in duplicate groups.
    pub duplicate_size: u64,
    /// Space freed if only the largest copy of each group were kept.
    pub reclaimable_space: u64,
    /// Warning recorded when the classifier degraded; `None` on success.
    pub degraded: Option<String>,
    /// Wall time spent hashing.
    pub hash_duration: Duration,
    /// Wall time spent classifying.
    pub classify_duration: Duration,
    /// Wall time for the whole scan.
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Whether the scan completed with non-fatal degradations.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty() || self.degraded.is_some()
    }
}

/// The pipeline's final output: active duplicate groups plus summary.
#[derive(Debug)]
pub struct ScanReport {
    /// Duplicate groups in first-seen order, members in discovery order,
    /// categories resolved.
    pub groups: Vec<DuplicateGroup>,
    /// Scan statistics, skipped files, and degradation warnings.
    pub summary: ScanSummary,
}

/// Errors that are fatal to a scan invocation.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Fewer than two files were supplied; nothing can be a duplicate.
    /// Rejected before any work starts.
    #[error("at least 2 files are required to scan for duplicates, got {0}")]
    TooFewFiles(usize),

    /// The scan was cancelled via the shutdown flag.
    #[error("scan interrupted")]
    Interrupted,
}

/// Orchestrates hashing, grouping, and classification for one scan.
///
/// # Example
///
/// ```no_run
/// use dupescout::duplicates::{PipelineConfig, ScanPipeline};
/// use dupescout::scanner::{Walker, WalkerConfig};
/// use std::path::Path;
///
/// let walker = Walker::new(Path::new("."), WalkerConfig::default());
/// let (descriptors, _) = walker.collect_descriptors().unwrap();
///
/// let pipeline = ScanPipeline::new(PipelineConfig::default().with_io_threads(4));
/// let report = pipeline.run(descriptors).unwrap();
/// println!("{} duplicate groups", report.groups.len());
/// ```
pub struct ScanPipeline {
    config: PipelineConfig,
    hasher: Arc<Hasher>,
    resolver: Option<Arc<CategoryResolver>>,
}

impl ScanPipeline {
    /// Create a pipeline with the given configuration and no classifier.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            hasher: Arc::new(Hasher::new()),
            resolver: None,
        }
    }

    /// Attach a category resolver. Without one, every record keeps the
    /// default category.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<CategoryResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run the full pipeline over an ordered descriptor collection.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::TooFewFiles`] for fewer than two descriptors
    ///   (validated before any work).
    /// - [`PipelineError::Interrupted`] when the shutdown flag is observed
    ///   at a stage boundary.
    ///
    /// Per-file read failures and classifier degradation are NOT errors;
    /// they are reported in the returned [`ScanSummary`].
    pub fn run(&self, descriptors: Vec<FileDescriptor>) -> Result<ScanReport, PipelineError> {
        let scan_start = std::time::Instant::now();

        if descriptors.len() < 2 {
            return Err(PipelineError::TooFewFiles(descriptors.len()));
        }

        let mut summary = ScanSummary {
            total_files: descriptors.len(),
            total_size: descriptors.iter().map(|d| d.size).sum(),
            ..Default::default()
        };

        if self.config.is_shutdown_requested() {
            return Err(PipelineError::Interrupted);
        }

        // Stage 1: hash fan-out.
        let hash_start = std::time::Instant::now();
        let records = self.hash_stage(descriptors, &mut summary);
        summary.hash_duration = hash_start.elapsed();

        if self.config.is_shutdown_requested() {
            log::info!("Scan interrupted after hashing");
            return Err(PipelineError::Interrupted);
        }

        // Stage 2: sequential grouping barrier.
        let (mut groups, group_stats) = group_by_hash(records);
        self.record_group_stats(&groups, &group_stats, &mut summary);

        if self.config.is_shutdown_requested() {
            log::info!("Scan interrupted after grouping");
            return Err(PipelineError::Interrupted);
        }

        // Stage 3: batched classification of duplicate members only.
        let classify_start = std::time::Instant::now();
        self.classify_stage(&mut groups, &mut summary);
        summary.classify_duration = classify_start.elapsed();

        if self.config.is_shutdown_requested() {
            log::info!("Scan interrupted after classification");
            return Err(PipelineError::Interrupted);
        }

        summary.scan_duration = scan_start.elapsed();
        log::info!(
            "Scan complete: {} groups, {} duplicate files, {} skipped, degraded: {}",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.skipped.len(),
            summary.degraded.is_some()
        );

        Ok(ScanReport { groups, summary })
    }

    /// Hash every descriptor on a bounded rayon pool, in input order.
    fn hash_stage(
        &self,
        descriptors: Vec<FileDescriptor>,
        summary: &mut ScanSummary,
    ) -> Vec<FileRecord> {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_stage_start("hashing", descriptors.len());
        }
        log::info!(
            "Hashing {} files on {} threads",
            descriptors.len(),
            self.config.io_threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
            .unwrap_or_else(|_| {
                log::warn!("Failed to build bounded thread pool, using default");
                rayon::ThreadPoolBuilder::new().build().expect("thread pool")
            });

        let hasher = Arc::clone(&self.hasher);
        let results: Vec<(FileDescriptor, Result<crate::scanner::Hash, HashError>)> =
            pool.install(|| {
                descriptors
                    .into_par_iter()
                    .enumerate()
                    .map(|(idx, descriptor)| {
                        if self.config.is_shutdown_requested() {
                            // Drained below; the interrupt is surfaced at the
                            // stage boundary.
                            let path = descriptor.path.clone();
                            return (
                                descriptor,
                                Err(HashError::Io {
                                    path,
                                    source: std::io::Error::new(
                                        std::io::ErrorKind::Interrupted,
                                        "shutdown requested",
                                    ),
                                }),
                            );
                        }
                        if let Some(ref callback) = self.config.progress_callback {
                            callback.on_progress(idx + 1, &descriptor.name);
                        }
                        let result = hasher.hash_source(&descriptor.source);
                        (descriptor, result)
                    })
                    .collect()
            });

        // Sequential reduction in input order keeps ids and group
        // membership deterministic.
        let mut records = Vec::with_capacity(results.len());
        for (idx, (descriptor, result)) in results.into_iter().enumerate() {
            match result {
                Ok(hash) => {
                    summary.hashed_files += 1;
                    records.push(FileRecord::from_descriptor(
                        FileId(idx as u64),
                        &descriptor,
                        hash,
                    ));
                }
                Err(e) => {
                    log::warn!("Excluding {} from scan: {}", descriptor.path.display(), e);
                    summary.skipped.push(SkippedFile {
                        path: descriptor.path,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_stage_end("hashing");
        }
        records
    }

    fn record_group_stats(
        &self,
        groups: &[DuplicateGroup],
        stats: &GroupingStats,
        summary: &mut ScanSummary,
    ) {
        summary.duplicate_groups = stats.duplicate_groups;
        summary.duplicate_files = stats.duplicate_files;
        summary.duplicate_size = stats.duplicate_size;
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::reclaimable_space).sum();
    }

    /// Classify all duplicate members in one batched resolver call.
    fn classify_stage(&self, groups: &mut [DuplicateGroup], summary: &mut ScanSummary) {
        let Some(resolver) = &self.resolver else {
            log::debug!("No classifier attached, categories stay at default");
            return;
        };
        if groups.is_empty() {
            return;
        }

        let batch: Vec<ClassifyRequest> = groups
            .iter()
            .flat_map(|group| group.files.iter())
            .map(|file| ClassifyRequest {
                file_id: file.id,
                file_name: file.name.clone(),
                file_type: file.mime_type.clone(),
                file_size: file.size,
                file_path: file.path.to_string_lossy().into_owned(),
            })
            .collect();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_stage_start("classifying", 0);
            callback.on_message(&format!("Categorizing {} duplicate files", batch.len()));
        }

        match resolver.resolve(batch) {
            Ok(resolved) => {
                for group in groups.iter_mut() {
                    for file in &mut group.files {
                        if let Some(answer) = resolved.get(&file.id) {
                            file.category = answer.category;
                            file.category_confidence = answer.confidence;
                        } else {
                            // Resolver omitted this file: default stands,
                            // confidence 0.
                            log::debug!("No category answer for {}, using Other", file.id);
                        }
                    }
                }
            }
            Err(e) => {
                // Degraded mode: every file keeps Other / 0.0 and the scan
                // continues.
                log::warn!("Category resolver degraded: {e}");
                summary.degraded = Some(e.to_string());
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_stage_end("classifying");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Category, Classifier, ClassifierError, ClassifyResponse};
    use crate::scanner::ContentSource;
    use chrono::{TimeZone, Utc};

    fn descriptor(name: &str, bytes: &[u8]) -> FileDescriptor {
        FileDescriptor::from_bytes(
            name,
            name,
            "application/octet-stream",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            bytes.to_vec(),
        )
    }

    #[test]
    fn test_rejects_fewer_than_two_files() {
        let pipeline = ScanPipeline::new(PipelineConfig::default());
        let err = pipeline.run(vec![descriptor("a", b"x")]).unwrap_err();
        assert!(matches!(err, PipelineError::TooFewFiles(1)));
    }

    #[test]
    fn test_identical_bytes_grouped_once() {
        let pipeline = ScanPipeline::new(PipelineConfig::default());
        let report = pipeline
            .run(vec![
                descriptor("a.bin", b"same"),
                descriptor("b.bin", b"same"),
                descriptor("c.bin", b"other"),
            ])
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].len(), 2);
        assert_eq!(report.groups[0].total_size, 8);
        assert_eq!(report.summary.duplicate_files, 2);
    }

    #[test]
    fn test_unreadable_file_skipped_not_fatal() {
        let mut bad = descriptor("ghost.bin", b"");
        bad.source = ContentSource::Path("/definitely/missing/ghost.bin".into());

        let pipeline = ScanPipeline::new(PipelineConfig::default());
        let report = pipeline
            .run(vec![
                descriptor("a.bin", b"same"),
                descriptor("b.bin", b"same"),
                bad,
            ])
            .unwrap();

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.summary.skipped.len(), 1);
        assert!(report.summary.is_partial());
        assert_eq!(report.summary.hashed_files, 2);
    }

    #[test]
    fn test_interrupt_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let pipeline =
            ScanPipeline::new(PipelineConfig::default().with_shutdown_flag(flag));
        let err = pipeline
            .run(vec![descriptor("a", b"x"), descriptor("b", b"x")])
            .unwrap_err();
        assert!(matches!(err, PipelineError::Interrupted));
    }

    struct EchoClassifier(Category);

    impl Classifier for EchoClassifier {
        fn classify(
            &self,
            batch: &[ClassifyRequest],
        ) -> Result<Vec<ClassifyResponse>, ClassifierError> {
            Ok(batch
                .iter()
                .map(|r| ClassifyResponse {
                    file_id: r.file_id,
                    category: self.0.as_str().to_string(),
                    confidence: 0.9,
                    reasoning: None,
                })
                .collect())
        }
    }

    struct DownClassifier;

    impl Classifier for DownClassifier {
        fn classify(
            &self,
            _batch: &[ClassifyRequest],
        ) -> Result<Vec<ClassifyResponse>, ClassifierError> {
            Err(ClassifierError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_classification_applied_to_members() {
        let resolver = CategoryResolver::new(
            Arc::new(EchoClassifier(Category::Media)),
            Duration::from_secs(5),
        );
        let pipeline =
            ScanPipeline::new(PipelineConfig::default()).with_resolver(Arc::new(resolver));
        let report = pipeline
            .run(vec![descriptor("a.mp3", b"tune"), descriptor("b.mp3", b"tune")])
            .unwrap();

        for file in &report.groups[0].files {
            assert_eq!(file.category, Category::Media);
            assert_eq!(file.category_confidence, 0.9);
        }
        assert!(report.summary.degraded.is_none());
    }

    #[test]
    fn test_classifier_failure_degrades_to_other() {
        let resolver =
            CategoryResolver::new(Arc::new(DownClassifier), Duration::from_secs(5));
        let pipeline =
            ScanPipeline::new(PipelineConfig::default()).with_resolver(Arc::new(resolver));
        let report = pipeline
            .run(vec![descriptor("a.bin", b"x"), descriptor("b.bin", b"x")])
            .unwrap();

        assert!(report.summary.degraded.is_some());
        for file in &report.groups[0].files {
            assert_eq!(file.category, Category::Other);
            assert_eq!(file.category_confidence, 0.0);
        }
    }

    #[test]
    fn test_pipeline_deterministic() {
        let make = || {
            vec![
                descriptor("z.bin", b"dup"),
                descriptor("a.bin", b"dup"),
                descriptor("m.bin", b"dup2"),
                descriptor("n.bin", b"dup2"),
            ]
        };
        let pipeline = ScanPipeline::new(PipelineConfig::default());
        let first = pipeline.run(make()).unwrap();
        let second = pipeline.run(make()).unwrap();

        assert_eq!(first.groups.len(), second.groups.len());
        for (a, b) in first.groups.iter().zip(second.groups.iter()) {
            assert_eq!(a.hash, b.hash);
            assert_eq!(a.file_ids(), b.file_ids());
        }
    }
}
