//! Command-line interface definitions.
//!
//! All CLI arguments and subcommands via the clap derive API. Global
//! options (verbosity, color) sit on the top-level parser; `scan` carries
//! the per-run knobs.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory, human-readable report
//! dupescout scan ~/Downloads
//!
//! # JSON output with recommendations for scripting
//! dupescout scan ~/Downloads --output json --recommend
//!
//! # Apply smart clean (soft delete in the report, nothing is unlinked)
//! dupescout scan ~/Downloads --smart-clean
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Duplicate file finder with category-aware cleanup recommendations.
///
/// DupeScout groups files by BLAKE3 content hash, categorizes duplicates
/// via a pluggable classifier, and recommends which copy of each group to
/// keep.
#[derive(Debug, Parser)]
#[command(name = "dupescout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Emit errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Write a default dupescout.toml configuration file
    InitConfig(InitConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory path to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Path to the configuration file (default: ./dupescout.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum file size to consider (e.g. 1KB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g. 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Follow symbolic links during scan
    ///
    /// Warning: may loop forever if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Number of worker threads for hashing
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Classifier timeout in seconds (expiry degrades categories to Other)
    #[arg(long, value_name = "SECS")]
    pub classify_timeout: Option<u64>,

    /// Skip categorization entirely
    #[arg(long)]
    pub no_classify: bool,

    /// Compute a retention recommendation for every group
    #[arg(long)]
    pub recommend: bool,

    /// Apply Smart Clean: soft-delete everything but the recommended copy
    /// of each group (implies --recommend; nothing is unlinked)
    #[arg(long)]
    pub smart_clean: bool,
}

/// Arguments for the init-config subcommand.
#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Where to write the config file
    #[arg(value_name = "FILE", default_value = crate::config::DEFAULT_CONFIG_FILE)]
    pub path: PathBuf,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored report
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// (case-insensitive); bare numbers are bytes.
///
/// # Errors
///
/// Returns a description of the problem for malformed input.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty size".to_string());
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid number in size: {input:?}"))?;

    let multiplier: u64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "kib" => 1 << 10,
        "mb" => 1_000_000,
        "mib" => 1 << 20,
        "gb" => 1_000_000_000,
        "gib" => 1 << 30,
        "tb" => 1_000_000_000_000,
        "tib" => 1 << 40,
        other => return Err(format!("unknown size suffix: {other:?}")),
    };

    Ok((value * multiplier as f64) as u64)
}
