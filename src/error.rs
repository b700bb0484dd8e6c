//! Structured error handling and exit codes.
//!
//! [`EngineError`] covers every rejection the result engine can report at the
//! command boundary. None of them is fatal: state is left untouched when a
//! command fails. [`ExitCode`] and [`StructuredError`] are the CLI's view of
//! the same failures.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::results::{FileKey, GroupId};

/// Errors returned by engine commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The file is not a member of the group it was addressed through.
    #[error("file {file} is not a member of group {group}")]
    NotAMember { group: GroupId, file: FileKey },

    /// Marking this file would leave its group without an unmarked copy.
    #[error("cannot mark {file}: group {group} must keep at least one unmarked file")]
    WouldEmptyGroup { group: GroupId, file: FileKey },

    /// Marks are owned by the power marker until it is switched off.
    #[error("marks cannot be changed by hand while the power marker is on")]
    PowerMarkerOn,

    /// A file action batch is running against the files this command touches.
    #[error("a file action is in progress")]
    ActionInProgress,

    /// No group in the current results has this file.
    #[error("unknown file {0}")]
    UnknownFile(FileKey),

    /// No group in the current results has this id.
    #[error("unknown group {0}")]
    UnknownGroup(GroupId),

    /// Groups handed to the engine were malformed.
    #[error("invalid duplicate group: {0}")]
    InvalidGroup(String),

    /// `complete_action` was called without a matching `begin_action`.
    #[error("no file action is in progress")]
    NoActionInFlight,

    /// A single-file operation (rename, reveal) failed.
    #[error("operation failed for {path}: {reason}")]
    OperationFailed { path: PathBuf, reason: String },
}

/// Exit codes for the dupemark binary.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Nothing to do (no groups, or no marked files for an action)
/// - 3: Partial success (some files failed during an action)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed normally.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Nothing to do: no duplicate groups or no marked files.
    NothingToDo = 2,
    /// Partial success: an action completed but some files failed.
    PartialSuccess = 3,
    /// Interrupted: an action batch was cancelled by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DM000",
            Self::GeneralError => "DM001",
            Self::NothingToDo => "DM002",
            Self::PartialSuccess => "DM003",
            Self::Interrupted => "DM130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DM001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
