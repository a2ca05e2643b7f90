//! CSV output formatter for scan results.
//!
//! One row per duplicate file, suitable for spreadsheets. The
//! `recommended_keep` column marks the member a computed recommendation
//! selected.

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::duplicates::ScanReport;
use crate::recommend::Recommendation;
use crate::scanner::Hash;

/// One CSV row describing a duplicate file.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_hash: String,
    file_id: String,
    name: &'a str,
    path: String,
    size: u64,
    mime_type: &'a str,
    last_modified: String,
    category: String,
    version: Option<&'a str>,
    recommended_keep: bool,
}

/// Write the report as CSV.
///
/// # Errors
///
/// Returns an error on serialization or I/O failure.
pub fn write_csv<W: Write>(
    writer: W,
    report: &ScanReport,
    recommendations: &HashMap<Hash, Recommendation>,
) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for group in &report.groups {
        let keep = recommendations.get(&group.hash).map(|r| r.file_to_keep);
        let hash = group.hash_hex();
        for file in &group.files {
            csv_writer.serialize(CsvRow {
                group_hash: hash.clone(),
                file_id: file.id.to_string(),
                name: &file.name,
                path: file.path.to_string_lossy().into_owned(),
                size: file.size,
                mime_type: &file.mime_type,
                last_modified: file.last_modified.to_rfc3339(),
                category: file.category.to_string(),
                version: file.version.as_deref(),
                recommended_keep: keep == Some(file.id),
            })?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{PipelineConfig, ScanPipeline};
    use crate::scanner::FileDescriptor;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_csv_one_row_per_file() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let pipeline = ScanPipeline::new(PipelineConfig::default());
        let report = pipeline
            .run(vec![
                FileDescriptor::from_bytes("a.bin", "a.bin", "application/octet-stream", ts, b"dup".to_vec()),
                FileDescriptor::from_bytes("b.bin", "b.bin", "application/octet-stream", ts, b"dup".to_vec()),
                FileDescriptor::from_bytes("c.bin", "c.bin", "application/octet-stream", ts, b"solo".to_vec()),
            ])
            .unwrap();

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &report, &HashMap::new()).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<_> = text.lines().collect();
        // Header plus the two duplicate rows; the singleton never appears.
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("group_hash"));
        assert!(text.contains("a.bin"));
        assert!(!text.contains("c.bin"));
    }
}
