//! JSON output formatter for scan results.
//!
//! Machine-readable output for scripting: duplicate groups with their
//! categorized members, optional retention recommendations, and summary
//! statistics including skipped files and degradation warnings.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, ScanReport, SkippedFile};
use crate::error::ExitCode;
use crate::recommend::Recommendation;
use crate::scanner::{FileRecord, Hash};

/// A member file in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Stable per-scan id, e.g. "file-3".
    pub id: String,
    /// File name.
    pub name: String,
    /// Path relative to the scan root.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Last modification time, RFC 3339.
    pub last_modified: String,
    /// Resolved category name.
    pub category: String,
    /// Version string, if detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl JsonFile {
    fn from_record(record: &FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name.clone(),
            path: record.path.to_string_lossy().into_owned(),
            size: record.size,
            mime_type: record.mime_type.clone(),
            last_modified: record.last_modified.to_rfc3339(),
            category: record.category.to_string(),
            version: record.version.clone(),
        }
    }
}

/// A retention recommendation in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRecommendation {
    /// Id of the member to keep.
    pub file_to_keep: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable explanation.
    pub rationale: String,
}

/// A duplicate group in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// Content hash as hexadecimal (64 characters).
    pub hash: String,
    /// Space occupied by all copies.
    pub total_size: u64,
    /// Space freed if only the largest copy were kept.
    pub reclaimable_space: u64,
    /// Member files in discovery order.
    pub files: Vec<JsonFile>,
    /// Retention recommendation, when one was computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<JsonRecommendation>,
}

impl JsonGroup {
    fn from_group(group: &DuplicateGroup, recommendation: Option<&Recommendation>) -> Self {
        Self {
            hash: group.hash_hex(),
            total_size: group.total_size,
            reclaimable_space: group.reclaimable_space(),
            files: group.files.iter().map(JsonFile::from_record).collect(),
            recommendation: recommendation.map(|r| JsonRecommendation {
                file_to_keep: r.file_to_keep.to_string(),
                confidence: r.confidence,
                rationale: r.rationale.clone(),
            }),
        }
    }
}

/// Summary statistics in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files ingested.
    pub total_files: usize,
    /// Total size of all ingested files.
    pub total_size: u64,
    /// Number of duplicate groups.
    pub duplicate_groups: usize,
    /// Number of files inside duplicate groups.
    pub duplicate_files: usize,
    /// Space occupied by all copies in duplicate groups.
    pub duplicate_size: u64,
    /// Space freed if only the largest copy of each group were kept.
    pub reclaimable_space: u64,
    /// Files excluded because their content was unreadable.
    pub skipped: Vec<SkippedFile>,
    /// Classifier degradation warning, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    /// Wall time spent hashing, milliseconds.
    pub hash_duration_ms: u64,
    /// Wall time spent classifying, milliseconds.
    pub classify_duration_ms: u64,
    /// Wall time for the whole scan, milliseconds.
    pub scan_duration_ms: u64,
    /// Numeric exit code.
    pub exit_code: i32,
    /// Machine-readable exit code name, e.g. "DS000".
    pub exit_code_name: String,
}

/// Complete JSON output document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups in first-seen order.
    pub duplicates: Vec<JsonGroup>,
    /// Scan summary.
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output document from a scan report.
    ///
    /// `recommendations` may be empty; groups without an entry simply
    /// omit the recommendation field.
    #[must_use]
    pub fn new(
        report: &ScanReport,
        recommendations: &HashMap<Hash, Recommendation>,
        exit_code: ExitCode,
    ) -> Self {
        let duplicates = report
            .groups
            .iter()
            .map(|group| JsonGroup::from_group(group, recommendations.get(&group.hash)))
            .collect();
        let summary = &report.summary;
        Self {
            duplicates,
            summary: JsonSummary {
                total_files: summary.total_files,
                total_size: summary.total_size,
                duplicate_groups: summary.duplicate_groups,
                duplicate_files: summary.duplicate_files,
                duplicate_size: summary.duplicate_size,
                reclaimable_space: summary.reclaimable_space,
                skipped: summary.skipped.clone(),
                degraded: summary.degraded.clone(),
                hash_duration_ms: summary.hash_duration.as_millis() as u64,
                classify_duration_ms: summary.classify_duration.as_millis() as u64,
                scan_duration_ms: summary.scan_duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or I/O failure.
    pub fn write_to<W: Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let json = self.to_json_pretty()?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{PipelineConfig, ScanPipeline};
    use crate::recommend::Recommender;
    use crate::scanner::FileDescriptor;
    use chrono::{TimeZone, Utc};

    fn sample_report() -> ScanReport {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let pipeline = ScanPipeline::new(PipelineConfig::default());
        pipeline
            .run(vec![
                FileDescriptor::from_bytes("a.bin", "a.bin", "application/octet-stream", ts, b"dup".to_vec()),
                FileDescriptor::from_bytes("b.bin", "b.bin", "application/octet-stream", ts, b"dup".to_vec()),
            ])
            .unwrap()
    }

    #[test]
    fn test_json_output_shape() {
        let report = sample_report();
        let output = JsonOutput::new(&report, &HashMap::new(), ExitCode::Success);
        let json = output.to_json_pretty().unwrap();

        assert!(json.contains("\"duplicates\""));
        assert!(json.contains("\"total_size\": 6"));
        assert!(json.contains("\"exit_code_name\": \"DS000\""));
        // No recommendation was supplied, so the field is omitted.
        assert!(!json.contains("recommendation"));
    }

    #[test]
    fn test_json_output_includes_recommendation() {
        let report = sample_report();
        let group = &report.groups[0];
        let refs: Vec<_> = group.files.iter().collect();
        let rec = Recommender::new().recommend(group.hash, &refs).unwrap();
        let recommendations = HashMap::from([(group.hash, rec)]);

        let output = JsonOutput::new(&report, &recommendations, ExitCode::Success);
        let json = output.to_json().unwrap();
        assert!(json.contains("file_to_keep"));
    }
}
