//! Batch execution of file actions over marked files.
//!
//! An [`ActionBatch`] is a snapshot of the files to act on plus the action
//! itself. Running it calls the [`FileOperations`] provider once per file and
//! records one [`FileOutcome`] per file. A failing file never stops the
//! batch. Once the shared cancel flag is raised, every file not yet attempted
//! is recorded as [`SkipReason::Cancelled`].
//!
//! The batch owns its data, so it can be moved to a worker thread while the
//! engine keeps serving projections.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::ops::{DeleteOptions, FileOperations};
use crate::results::{Directories, DirectoryState, FileKey, FileRef};

/// File action applied to every file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Delete to trash or permanently.
    Delete(DeleteOptions),
    /// Move into a destination directory.
    Move { dest: PathBuf },
    /// Copy into a destination directory.
    Copy { dest: PathBuf },
}

impl ActionKind {
    /// Whether applied files leave their original location.
    #[must_use]
    pub fn removes_files(&self) -> bool {
        !matches!(self, Self::Copy { .. })
    }

    fn verb(&self) -> &'static str {
        match self {
            Self::Delete(options) if options.use_trash => "Trashed",
            Self::Delete(_) => "Deleted",
            Self::Move { .. } => "Moved",
            Self::Copy { .. } => "Copied",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delete(options) if options.use_trash => write!(f, "delete to trash"),
            Self::Delete(_) => write!(f, "permanent delete"),
            Self::Move { dest } => write!(f, "move to {}", dest.display()),
            Self::Copy { dest } => write!(f, "copy to {}", dest.display()),
        }
    }
}

/// Why a file was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    /// The file no longer exists.
    Gone,
    /// The batch was cancelled before this file was attempted.
    Cancelled,
    /// The file lies in an excluded directory and `direct_only` was set.
    Excluded,
}

/// Result of acting on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum ActionOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(String),
}

/// Outcome for a single file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file: FileRef,
    pub outcome: ActionOutcome,
    /// New location for moved or copied files.
    pub target: Option<PathBuf>,
}

/// Per-file results of a batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: Vec<FileOutcome>,
    /// Total size of applied files.
    pub bytes_processed: u64,
    /// Whether the batch stopped early on cancellation.
    pub cancelled: bool,
    verb: &'static str,
}

impl BatchReport {
    /// Number of files the action was applied to.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.count(|o| *o == ActionOutcome::Applied)
    }

    /// Number of skipped files, for any reason.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Skipped(_)))
    }

    /// Number of failed files.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ActionOutcome::Failed(_)))
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }

    /// Check if no file failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }

    /// Keys of files the action was applied to.
    pub fn applied(&self) -> impl Iterator<Item = FileKey> + '_ {
        self.keys_where(|o| *o == ActionOutcome::Applied)
    }

    /// Keys of files found missing on disk.
    pub fn gone(&self) -> impl Iterator<Item = FileKey> + '_ {
        self.keys_where(|o| *o == ActionOutcome::Skipped(SkipReason::Gone))
    }

    /// Human-readable summary of the batch.
    #[must_use]
    pub fn summary(&self) -> String {
        let verb = if self.verb.is_empty() { "Processed" } else { self.verb };
        let mut summary = format!(
            "{} {} file(s) ({})",
            verb,
            self.applied_count(),
            bytesize::ByteSize(self.bytes_processed)
        );
        let skipped = self.skipped_count();
        if skipped > 0 {
            summary.push_str(&format!(", {} skipped", skipped));
        }
        let failed = self.failed_count();
        if failed > 0 {
            summary.push_str(&format!(", {} failed", failed));
        }
        if self.cancelled {
            summary.push_str(", cancelled");
        }
        summary
    }

    fn count(&self, pred: impl Fn(&ActionOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }

    fn keys_where<'a>(
        &'a self,
        pred: impl Fn(&ActionOutcome) -> bool + 'a,
    ) -> impl Iterator<Item = FileKey> + 'a {
        self.entries
            .iter()
            .filter(move |e| pred(&e.outcome))
            .map(|e| e.file.key())
    }
}

/// Callback trait for batch progress reporting.
pub trait ActionProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_start(&self, total: usize);

    /// Called before a file is attempted.
    fn on_file(&self, file: &FileRef, index: usize, total: usize);

    /// Called after each file with its outcome.
    fn on_outcome(&self, outcome: &FileOutcome);

    /// Called when the batch finishes or is cancelled.
    fn on_complete(&self, report: &BatchReport);
}

/// Snapshot of files plus the action to apply to them.
#[derive(Debug, Clone)]
pub struct ActionBatch {
    kind: ActionKind,
    files: Vec<FileRef>,
    cancel: Arc<AtomicBool>,
    directories: Option<Directories>,
}

impl ActionBatch {
    #[must_use]
    pub fn new(kind: ActionKind, files: Vec<FileRef>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            kind,
            files,
            cancel,
            directories: None,
        }
    }

    /// Directory states consulted by `direct_only` deletion.
    #[must_use]
    pub fn with_directories(mut self, directories: Option<Directories>) -> Self {
        self.directories = directories;
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    #[must_use]
    pub fn files(&self) -> &[FileRef] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Flag that cancels this batch when set.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the batch without progress reporting.
    #[must_use]
    pub fn run(&self, ops: &dyn FileOperations) -> BatchReport {
        self.run_with_progress(ops, None)
    }

    /// Run the batch, reporting each file to `callback`.
    #[must_use]
    pub fn run_with_progress(
        &self,
        ops: &dyn FileOperations,
        callback: Option<&dyn ActionProgressCallback>,
    ) -> BatchReport {
        let total = self.files.len();
        let mut report = BatchReport {
            verb: self.kind.verb(),
            ..BatchReport::default()
        };

        log::info!("Starting {} of {} file(s)", self.kind, total);
        if let Some(cb) = callback {
            cb.on_start(total);
        }

        for (index, file) in self.files.iter().enumerate() {
            if !report.cancelled && self.cancel.load(Ordering::SeqCst) {
                log::info!("Action cancelled, skipping {} remaining file(s)", total - index);
                report.cancelled = true;
            }

            let entry = if report.cancelled {
                FileOutcome {
                    file: file.clone(),
                    outcome: ActionOutcome::Skipped(SkipReason::Cancelled),
                    target: None,
                }
            } else {
                if let Some(cb) = callback {
                    cb.on_file(file, index, total);
                }
                self.apply_one(ops, file)
            };

            if entry.outcome == ActionOutcome::Applied {
                report.bytes_processed += file.size();
            }
            if let Some(cb) = callback {
                cb.on_outcome(&entry);
            }
            report.entries.push(entry);
        }

        if let Some(cb) = callback {
            cb.on_complete(&report);
        }
        log::info!("{}", report.summary());

        report
    }

    fn apply_one(&self, ops: &dyn FileOperations, file: &FileRef) -> FileOutcome {
        if let ActionKind::Delete(options) = &self.kind {
            if options.direct_only && self.is_excluded(file) {
                log::debug!("Skipping {} (excluded directory)", file.path().display());
                return FileOutcome {
                    file: file.clone(),
                    outcome: ActionOutcome::Skipped(SkipReason::Excluded),
                    target: None,
                };
            }
        }

        let result = match &self.kind {
            ActionKind::Delete(options) => ops.delete(file, options).map(|()| None),
            ActionKind::Move { dest } => ops.move_to(file, dest).map(Some),
            ActionKind::Copy { dest } => ops.copy_to(file, dest).map(Some),
        };

        let (outcome, target) = match result {
            Ok(target) => (ActionOutcome::Applied, target),
            Err(e) if e.is_gone() => {
                log::warn!("Skipping {}: already gone", file.path().display());
                (ActionOutcome::Skipped(SkipReason::Gone), None)
            }
            Err(e) => {
                log::warn!("Failed to {} {}: {}", self.kind, file.path().display(), e);
                (ActionOutcome::Failed(e.to_string()), None)
            }
        };

        FileOutcome {
            file: file.clone(),
            outcome,
            target,
        }
    }

    fn is_excluded(&self, file: &FileRef) -> bool {
        self.directories
            .as_ref()
            .is_some_and(|dirs| dirs.state_of_file(file.path()) == DirectoryState::Excluded)
    }
}
