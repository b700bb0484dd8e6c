//! Progress reporting for action batches using indicatif.
//!
//! [`BatchProgress`] implements [`ActionProgressCallback`] with a single
//! progress bar on stderr. In quiet mode the bar is hidden but still counts,
//! so callers can rely on it either way.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::actions::{ActionOutcome, ActionProgressCallback, BatchReport, FileOutcome};
use crate::results::FileRef;

/// Progress bar for a file action batch.
pub struct BatchProgress {
    bar: ProgressBar,
    label: String,
}

impl BatchProgress {
    /// Create a reporter labelled with the action, e.g. "Deleting".
    ///
    /// # Examples
    ///
    /// ```
    /// use dupemark::progress::BatchProgress;
    ///
    /// let progress = BatchProgress::new("Deleting", true);
    /// ```
    #[must_use]
    pub fn new(label: impl Into<String>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(Self::style());
        Self {
            bar,
            label: label.into(),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    /// Files reported so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ActionProgressCallback for BatchProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message(self.label.clone());
    }

    fn on_file(&self, file: &FileRef, _index: usize, _total: usize) {
        self.bar.set_message(format!(
            "{}: {}",
            self.label,
            truncate_path(file.path(), 30)
        ));
    }

    fn on_outcome(&self, outcome: &FileOutcome) {
        if let ActionOutcome::Failed(reason) = &outcome.outcome {
            self.bar.suspend(|| {
                eprintln!("Failed: {}: {}", outcome.file.path().display(), reason);
            });
        }
        self.bar.inc(1);
    }

    fn on_complete(&self, report: &BatchReport) {
        self.bar.finish_with_message(report.summary());
    }
}

/// Shorten a path to its file name when it is too long to display.
fn truncate_path(path: &Path, max_chars: usize) -> String {
    let full = path.to_string_lossy();
    if full.chars().count() <= max_chars {
        return full.into_owned();
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let count = name.chars().count();
    if count + 4 > max_chars {
        let tail: String = name.chars().skip(count + 3 - max_chars).collect();
        return format!("...{}", tail);
    }
    format!(".../{}", name)
}
