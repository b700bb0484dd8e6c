//! Command-line interface definitions for dupemark.
//!
//! Every command works on a session file produced by a scan. Commands that
//! change marks, references or membership save the session back.
//!
//! # Example
//!
//! ```bash
//! # List groups whose path matches "photos"
//! dupemark show results.json --filter photos
//!
//! # Keep the newest copy of each file, mark the rest
//! dupemark mark results.json --reprioritize mtime:highest --all
//!
//! # Send marked files to the trash
//! dupemark apply results.json delete
//! ```

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::results::Criterion;

/// Review, mark and act on duplicate file groups.
///
/// dupemark reads the groups found by a duplicate scan from a session file,
/// lets you pick which copy to keep and which to mark, and applies delete,
/// move or copy to the marked files.
#[derive(Debug, Parser)]
#[command(name = "dupemark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the groups of a session
    Show(ShowArgs),
    /// Change marks and references
    Mark(MarkArgs),
    /// Apply an action to every marked file
    Apply(ApplyArgs),
    /// Rename one file on disk
    Rename(RenameArgs),
    /// Manage the ignore list
    #[command(subcommand)]
    Ignore(IgnoreCommand),
}

/// Arguments for `show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Session file to read
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Only show groups with a file whose path contains TEXT
    #[arg(long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Only show groups whose files differ in size
    #[arg(long)]
    pub delta: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for `mark`.
///
/// Steps run in a fixed order: power marker, reprioritize, reference,
/// bulk marking, then per-file toggles.
#[derive(Debug, Args)]
pub struct MarkArgs {
    /// Session file to update
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Mark every file except each group's reference
    #[arg(long, conflicts_with_all = ["none", "invert"])]
    pub all: bool,

    /// Clear every mark
    #[arg(long, conflicts_with = "invert")]
    pub none: bool,

    /// Invert marks in every group
    #[arg(long)]
    pub invert: bool,

    /// Turn the power marker on or off
    #[arg(long, value_enum, value_name = "STATE")]
    pub power_marker: Option<Switch>,

    /// Pick new references by criteria, in priority order
    ///
    /// Criteria: depth, mtime, size, name (each with an optional
    /// `:lowest`/`:highest`), `folder:DIR[,DIR...]`, reference-dirs.
    #[arg(long, value_name = "CRITERION")]
    pub reprioritize: Vec<Criterion>,

    /// Reprioritize with the criteria from the configuration file
    #[arg(long, conflicts_with = "reprioritize")]
    pub default_criteria: bool,

    /// Make this file the reference of its group (repeatable)
    #[arg(long = "reference", value_name = "PATH")]
    pub references: Vec<PathBuf>,

    /// Toggle the mark of this file (repeatable, all or nothing)
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,
}

/// Arguments for `apply`.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Session file to update
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// What to do with the marked files
    #[arg(value_enum)]
    pub action: ApplyAction,

    /// Target directory for move and copy
    #[arg(long, value_name = "DIR", required_if_eq_any = [("action", "move"), ("action", "copy")])]
    pub dest: Option<PathBuf>,

    /// Delete permanently instead of moving to the trash
    ///
    /// Warning: Files cannot be recovered after permanent deletion.
    #[arg(long)]
    pub permanent: bool,

    /// Skip files inside excluded directories when deleting
    #[arg(long)]
    pub direct_only: bool,
}

/// Arguments for `rename`.
#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Session file to update
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// File to rename, as listed by `show`
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// New file name (no directory part)
    #[arg(value_name = "NEW_NAME")]
    pub new_name: String,
}

/// `ignore` subcommands.
#[derive(Debug, Subcommand)]
pub enum IgnoreCommand {
    /// Print every ignored pair
    List,
    /// Stop ignoring a pair
    Remove {
        #[arg(value_name = "A")]
        first: PathBuf,
        #[arg(value_name = "B")]
        second: PathBuf,
    },
    /// Forget every ignored pair
    Clear,
}

/// What `apply` does with marked files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ApplyAction {
    /// Delete marked files (trash by default)
    Delete,
    /// Move marked files into --dest
    Move,
    /// Copy marked files into --dest
    Copy,
    /// Add marked files to the ignore list and drop them from the results
    Ignore,
    /// Drop marked files from the results without touching disk
    Remove,
}

/// Output format for `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON for scripting
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// On/off value for toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}
