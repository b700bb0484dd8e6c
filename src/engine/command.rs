//! Commands accepted by the engine and the outcomes they produce.

use std::path::PathBuf;

use crate::actions::{ActionKind, BatchReport};
use crate::results::{Criterion, DuplicateGroup, FileKey, FilterState, GroupId, PowerMarker};

/// A request from the presentation layer.
///
/// Every command runs to completion through
/// [`Engine::execute`](super::Engine::execute) before the next is accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the results with a fresh scan. Resets marks and filter.
    LoadResults(Vec<DuplicateGroup>),
    /// Drop all results.
    ClearResults,

    /// Mark one file
    Mark(FileKey),
    /// Unmark one file
    Unmark(FileKey),
    /// Flip the mark of one file
    ToggleMark(FileKey),
    /// Flip the marks of several files at once, all or nothing
    MarkSelected(Vec<FileKey>),
    /// Mark every member of a group except its reference
    MarkAll(GroupId),
    /// Unmark every member of a group
    MarkNone(GroupId),
    /// Invert marks within a group
    Invert(GroupId),
    /// `MarkAll` over every group
    MarkAllGroups,
    /// Clear every mark
    UnmarkAll,
    /// `Invert` over every group
    InvertAll,

    /// Replace the view filter.
    SetFilter(FilterState),
    /// Flip the delta-only view.
    ToggleDelta,

    /// Pick new references by chained criteria.
    Reprioritize(Vec<Criterion>),
    /// Switch the power marker. While it is on, every mark command except
    /// `MarkAll` and `MarkAllGroups` is rejected with `PowerMarkerOn`.
    TogglePowerMarker,
    /// Make a member the reference of its group.
    MakeReference(FileKey),

    /// Drop marked files from the results without touching disk.
    RemoveMarked,
    /// Drop the given files from the results without touching disk.
    RemoveSelected(Vec<FileKey>),
    /// Add each marked duplicate to the ignore list against its reference,
    /// then drop it from the results. If the list cannot be saved, nothing
    /// changes.
    IgnoreMarked,

    /// Apply a file action to every marked file, synchronously.
    ExecuteAction(ActionKind),
    /// Rename one file on disk. Its key is kept.
    Rename { file: FileKey, new_name: String },
    /// Show one file in the platform file manager.
    Reveal(FileKey),
}

impl Command {
    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadResults(_) => "load-results",
            Self::ClearResults => "clear-results",
            Self::Mark(_) => "mark",
            Self::Unmark(_) => "unmark",
            Self::ToggleMark(_) => "toggle-mark",
            Self::MarkSelected(_) => "mark-selected",
            Self::MarkAll(_) => "mark-all",
            Self::MarkNone(_) => "mark-none",
            Self::Invert(_) => "invert",
            Self::MarkAllGroups => "mark-all-groups",
            Self::UnmarkAll => "unmark-all",
            Self::InvertAll => "invert-all",
            Self::SetFilter(_) => "set-filter",
            Self::ToggleDelta => "toggle-delta",
            Self::Reprioritize(_) => "reprioritize",
            Self::TogglePowerMarker => "toggle-power-marker",
            Self::MakeReference(_) => "make-reference",
            Self::RemoveMarked => "remove-marked",
            Self::RemoveSelected(_) => "remove-selected",
            Self::IgnoreMarked => "ignore-marked",
            Self::ExecuteAction(_) => "execute-action",
            Self::Rename { .. } => "rename",
            Self::Reveal(_) => "reveal",
        }
    }
}

/// What a command changed.
///
/// Dissolved groups are reported here, never as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// New results are in place.
    Loaded {
        groups: usize,
        /// Files removed by the ignore list.
        ignored: usize,
    },
    Cleared,
    /// Number of files whose mark changed.
    MarksChanged { changed: usize },
    /// Number of groups visible through the new filter.
    Filtered { visible: usize },
    /// Number of groups whose reference changed.
    Reprioritized { changed: usize },
    PowerMarker(PowerMarker),
    ReferenceChanged { group: GroupId, reference: FileKey },
    Removed {
        files: usize,
        dissolved: Vec<GroupId>,
    },
    Ignored {
        pairs: usize,
        dissolved: Vec<GroupId>,
    },
    ActionCompleted {
        report: BatchReport,
        /// Files dropped from the results (applied or already gone).
        removed: usize,
        dissolved: Vec<GroupId>,
    },
    Renamed { file: FileKey, path: PathBuf },
    Revealed,
}

impl Outcome {
    /// Groups dissolved by this command.
    #[must_use]
    pub fn dissolved(&self) -> &[GroupId] {
        match self {
            Self::Removed { dissolved, .. }
            | Self::Ignored { dissolved, .. }
            | Self::ActionCompleted { dissolved, .. } => dissolved,
            _ => &[],
        }
    }
}
