//! Output formatters for scan results.
//!
//! Three renderings of the same [`ScanReport`]:
//! - [`json`]: machine-readable document for scripting
//! - [`csv`]: one row per duplicate file for spreadsheets
//! - [`write_text`]: colored human-readable report for the terminal

pub mod csv;
pub mod json;

use std::collections::HashMap;
use std::io::Write;

use bytesize::ByteSize;
use yansi::Paint;

use crate::duplicates::ScanReport;
use crate::recommend::Recommendation;
use crate::scanner::Hash;

pub use self::csv::write_csv;
pub use self::json::JsonOutput;

/// Write a human-readable report to the given writer.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub fn write_text<W: Write>(
    mut writer: W,
    report: &ScanReport,
    recommendations: &HashMap<Hash, Recommendation>,
) -> anyhow::Result<()> {
    let summary = &report.summary;

    if report.groups.is_empty() {
        writeln!(writer, "{}", "No duplicates found.".green().bold())?;
    } else {
        writeln!(
            writer,
            "Found {} of duplicates in {} files across {} groups.",
            ByteSize(summary.duplicate_size).to_string().yellow().bold(),
            summary.duplicate_files,
            summary.duplicate_groups,
        )?;
        writeln!(
            writer,
            "Reclaimable if one copy of each is kept: {}",
            ByteSize(summary.reclaimable_space).to_string().yellow()
        )?;
    }

    for group in &report.groups {
        writeln!(writer)?;
        writeln!(
            writer,
            "{} {}  ({} copies, {})",
            "Group".cyan().bold(),
            &group.hash_hex()[..12],
            group.len(),
            ByteSize(group.total_size)
        )?;
        let recommendation = recommendations.get(&group.hash);
        for file in &group.files {
            let marker = if recommendation.is_some_and(|r| r.file_to_keep == file.id) {
                "keep ".green().bold().to_string()
            } else {
                "     ".to_string()
            };
            writeln!(
                writer,
                "  {marker}{}  {}  [{}]  {}",
                file.path.display(),
                ByteSize(file.size),
                file.category,
                file.last_modified.format("%Y-%m-%d"),
            )?;
        }
        if let Some(rec) = recommendation {
            writeln!(
                writer,
                "  {} {} (confidence {:.0}%)",
                "→".blue(),
                rec.rationale,
                rec.confidence * 100.0
            )?;
        }
    }

    if !summary.skipped.is_empty() {
        writeln!(writer)?;
        writeln!(
            writer,
            "{} {} file(s) were skipped:",
            "Warning:".yellow().bold(),
            summary.skipped.len()
        )?;
        for skipped in &summary.skipped {
            writeln!(writer, "  {}: {}", skipped.path.display(), skipped.error)?;
        }
    }

    if let Some(degraded) = &summary.degraded {
        writeln!(writer)?;
        writeln!(
            writer,
            "{} categorization degraded: {degraded}",
            "Warning:".yellow().bold()
        )?;
    }

    writeln!(
        writer,
        "\nScanned {} files ({}) in {:.2}s",
        summary.total_files,
        ByteSize(summary.total_size),
        summary.scan_duration.as_secs_f64()
    )?;

    Ok(())
}
