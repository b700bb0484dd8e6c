//! Data structures for result sessions.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Command, Engine, Outcome};
use crate::error::EngineError;
use crate::results::{DuplicateGroup, FileRef, PowerMarker, ResultsBuilder, ScannedFile};

/// Current version of the session file format.
pub const SESSION_VERSION: u32 = 1;

fn current_version() -> u32 {
    SESSION_VERSION
}

/// Saved duplicate results plus the review state attached to them.
///
/// Only `groups` is required when reading, so a scanner can hand over its
/// results without knowing the rest of the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Format version.
    #[serde(default = "current_version")]
    pub version: u32,
    /// When the session was written.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Duplicate groups, in discovery order.
    pub groups: Vec<SessionGroup>,
    /// Paths marked for action.
    #[serde(default)]
    pub marked: BTreeSet<PathBuf>,
    #[serde(default)]
    pub power_marker: PowerMarker,
}

/// A group of duplicates within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGroup {
    /// Defaults to 0; ids are reassigned by position on restore.
    #[serde(default)]
    pub id: usize,
    /// Index of the reference file in `files`.
    #[serde(default)]
    pub reference: usize,
    pub files: Vec<SessionFile>,
}

/// A file as recorded at scan time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    pub path: PathBuf,
    pub size: u64,
    /// Used to detect files changed since the scan.
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            modified: None,
        }
    }

    #[must_use]
    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified.into());
        self
    }
}

impl From<&FileRef> for SessionFile {
    fn from(file: &FileRef) -> Self {
        Self {
            path: file.path().to_path_buf(),
            size: file.size(),
            modified: file.modified().map(DateTime::<Utc>::from),
        }
    }
}

impl From<&SessionFile> for ScannedFile {
    fn from(file: &SessionFile) -> Self {
        Self {
            path: file.path.clone(),
            size: file.size,
            modified: file.modified.map(SystemTime::from),
        }
    }
}

impl Session {
    /// Create a new session with current timestamp and default version.
    #[must_use]
    pub fn new(groups: Vec<SessionGroup>) -> Self {
        Self {
            version: SESSION_VERSION,
            created_at: Utc::now(),
            groups,
            marked: BTreeSet::new(),
            power_marker: PowerMarker::Off,
        }
    }

    /// Capture the engine's groups, marks and power marker.
    #[must_use]
    pub fn from_engine(engine: &Engine) -> Self {
        let groups = engine
            .groups()
            .iter()
            .map(|g| SessionGroup {
                id: g.id().get(),
                reference: g.reference_index(),
                files: g.members().iter().map(SessionFile::from).collect(),
            })
            .collect();

        Self {
            marked: engine
                .marked_files()
                .into_iter()
                .map(|f| f.path().to_path_buf())
                .collect(),
            power_marker: engine.power_marker(),
            ..Self::new(groups)
        }
    }

    /// Build duplicate groups with fresh file keys.
    ///
    /// Groups with fewer than two distinct files are dropped with a warning.
    #[must_use]
    pub fn to_groups(&self) -> Vec<DuplicateGroup> {
        let builder = self.groups.iter().fold(ResultsBuilder::new(), |b, group| {
            b.group_with_reference(group.files.iter().map(ScannedFile::from), group.reference)
        });
        if builder.dropped() > 0 {
            log::warn!(
                "Session contains {} group(s) with fewer than two files, dropped",
                builder.dropped()
            );
        }
        builder.build()
    }

    /// Load this session into `engine`.
    ///
    /// The ignore list of the engine applies. With the power marker off,
    /// saved marks are restored where they still satisfy the mark rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the results.
    pub fn restore_into(&self, engine: &mut Engine) -> Result<Outcome, EngineError> {
        if engine.power_marker() != self.power_marker {
            engine.execute(Command::TogglePowerMarker)?;
        }
        let outcome = engine.execute(Command::LoadResults(self.to_groups()))?;

        if !self.power_marker.is_on() {
            for path in &self.marked {
                let Some(key) = engine.key_for_path(path) else {
                    log::debug!("Marked file no longer in results: {}", path.display());
                    continue;
                };
                if let Err(e) = engine.execute(Command::Mark(key)) {
                    log::warn!("Could not restore mark on {}: {}", path.display(), e);
                }
            }
        }
        Ok(outcome)
    }
}
