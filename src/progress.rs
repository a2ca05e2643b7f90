//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait; the
//! [`Progress`] struct renders those callbacks as terminal progress bars
//! for the CLI. Library users can plug in their own implementation (or
//! none at all).

use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for pipeline stages.
///
/// Implement this trait to receive progress updates while a scan runs.
pub trait ProgressCallback: Send + Sync {
    /// Called when a stage starts.
    ///
    /// # Arguments
    ///
    /// * `stage` - Name of the stage (e.g. "hashing", "classifying")
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_stage_start(&self, stage: &str, total: usize);

    /// Called for each item processed.
    fn on_progress(&self, current: usize, detail: &str);

    /// Called when a stage completes.
    fn on_stage_end(&self, stage: &str);

    /// Called with a free-form status message.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress reporter.
///
/// Shows a bar for the hashing fan-out and a spinner while the external
/// classifier is in flight.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// When `quiet` is true nothing is displayed.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:12} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl ProgressCallback for Progress {
    fn on_stage_start(&self, stage: &str, total: usize) {
        if self.quiet {
            return;
        }
        let bar = if total > 0 {
            let bar = self.multi.add(ProgressBar::new(total as u64));
            bar.set_style(Self::bar_style());
            bar
        } else {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(Self::spinner_style());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            bar
        };
        bar.set_message(stage.to_string());
        *self.active.lock().expect("progress lock") = Some(bar);
    }

    fn on_progress(&self, current: usize, _detail: &str) {
        if let Some(bar) = self.active.lock().expect("progress lock").as_ref() {
            bar.set_position(current as u64);
        }
    }

    fn on_stage_end(&self, stage: &str) {
        if let Some(bar) = self.active.lock().expect("progress lock").take() {
            bar.finish_and_clear();
        }
        log::debug!("Stage {stage} complete");
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.multi.println(message);
    }
}
