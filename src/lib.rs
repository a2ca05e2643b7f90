//! DupeScout - duplicate file finder with cleanup recommendations.
//!
//! A library and CLI for finding duplicate files by BLAKE3 content hash,
//! enriching duplicate groups with semantic categories from a pluggable
//! classifier, ranking which copy of each group to keep, and tracking
//! soft-delete / undo state in a per-scan cleanup session.

pub mod classify;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod recommend;
pub mod scanner;
pub mod session;
pub mod signal;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::classify::{CategoryResolver, RuleBasedClassifier};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{PipelineConfig, ScanPipeline};
use crate::error::ExitCode;
use crate::output::JsonOutput;
use crate::progress::Progress;
use crate::recommend::{Recommendation, Recommender};
use crate::scanner::{Hash, Walker, WalkerConfig};
use crate::session::CleanupSession;

/// Run the application with parsed CLI arguments.
///
/// # Errors
///
/// Returns an error for fatal failures only; degraded scans (skipped
/// files, classifier fallback) complete normally and are reflected in the
/// exit code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(args) => run_scan(args, cli.quiet),
        Commands::InitConfig(args) => {
            Config::write_default(&args.path)?;
            println!("Wrote {}", args.path.display());
            Ok(ExitCode::Success)
        }
    }
}

fn run_scan(args: ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);

    let handler = signal::install_handler().context("failed to install signal handler")?;

    let walker_config = WalkerConfig {
        follow_symlinks: config.follow_symlinks,
        skip_hidden: config.skip_hidden,
        min_size: config.min_size,
        max_size: config.max_size,
    };
    let walker = Walker::new(&args.path, walker_config);
    let (descriptors, walk_errors) = walker.collect_descriptors()?;

    if descriptors.len() < 2 {
        println!(
            "Only {} file(s) under {}; nothing to compare.",
            descriptors.len(),
            args.path.display()
        );
        return Ok(ExitCode::NoDuplicates);
    }

    let progress = Arc::new(Progress::new(quiet));
    let pipeline_config = PipelineConfig::default()
        .with_io_threads(config.io_threads)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);
    log::debug!("Scanning with {} hashing threads", pipeline_config.io_threads);

    let mut pipeline = ScanPipeline::new(pipeline_config);
    if config.classify {
        let resolver = CategoryResolver::new(
            Arc::new(RuleBasedClassifier::new()),
            config.classify_timeout(),
        );
        pipeline = pipeline.with_resolver(Arc::new(resolver));
    }

    let report = pipeline.run(descriptors)?;

    let recommender = build_recommender(&config)?;
    let session = CleanupSession::new(&report.groups);

    let mut recommendations: HashMap<Hash, Recommendation> = HashMap::new();
    if args.recommend || args.smart_clean {
        for group in &report.groups {
            match session.recommendation(group, &recommender) {
                Ok(rec) => {
                    recommendations.insert(group.hash, rec);
                }
                Err(e) => log::warn!("No recommendation for group {}: {e}", group.hash_hex()),
            }
        }
    }

    if args.smart_clean {
        for group in &report.groups {
            if !recommendations.contains_key(&group.hash) {
                continue;
            }
            let outcome = session.smart_clean(group)?;
            if !quiet {
                println!(
                    "Smart clean: kept {} in group {}, soft-deleted {} copies (undoable)",
                    outcome.kept,
                    &group.hash_hex()[..12],
                    outcome.removed.len()
                );
            }
        }
    }

    let exit_code = if report.groups.is_empty() {
        ExitCode::NoDuplicates
    } else if report.summary.is_partial() || !walk_errors.is_empty() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };

    let stdout = std::io::stdout().lock();
    match args.output {
        OutputFormat::Text => output::write_text(stdout, &report, &recommendations)?,
        OutputFormat::Json => {
            JsonOutput::new(&report, &recommendations, exit_code).write_to(stdout)?;
        }
        OutputFormat::Csv => output::write_csv(stdout, &report, &recommendations)?,
    }

    for error in &walk_errors {
        log::warn!("Discovery warning: {error}");
    }

    Ok(exit_code)
}

fn apply_cli_overrides(config: &mut Config, args: &ScanArgs) {
    if let Some(io_threads) = args.io_threads {
        config.io_threads = io_threads.max(1);
    }
    if let Some(min_size) = args.min_size {
        config.min_size = Some(min_size);
    }
    if let Some(max_size) = args.max_size {
        config.max_size = Some(max_size);
    }
    if args.skip_hidden {
        config.skip_hidden = true;
    }
    if args.follow_symlinks {
        config.follow_symlinks = true;
    }
    if let Some(timeout) = args.classify_timeout {
        config.classify_timeout_secs = timeout;
    }
    if args.no_classify {
        config.classify = false;
    }
}

fn build_recommender(config: &Config) -> Result<Recommender> {
    match (&config.official_patterns, &config.transient_patterns) {
        (None, None) => Ok(Recommender::new()),
        (official, transient) => {
            let official_defaults: Vec<String> = recommend::DEFAULT_OFFICIAL_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect();
            let transient_defaults: Vec<String> = recommend::DEFAULT_TRANSIENT_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect();
            Recommender::with_patterns(
                official.as_ref().unwrap_or(&official_defaults),
                transient.as_ref().unwrap_or(&transient_defaults),
            )
            .context("invalid path pattern in configuration")
        }
    }
}
