//! Duplicate detection module.
//!
//! This module provides:
//! - Content-hash grouping of ingested files
//! - The scan pipeline orchestrating hashing, grouping, and classification

pub mod groups;
pub mod pipeline;

pub use groups::{group_by_hash, DuplicateGroup, GroupingStats};
pub use pipeline::{
    PipelineConfig, PipelineError, ScanPipeline, ScanReport, ScanSummary, SkippedFile,
};
