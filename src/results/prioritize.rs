//! Re-selection of each group's reference file.
//!
//! A list of [`Criterion`] values is compared in order; the first criterion
//! that tells two files apart decides. Files that tie on every criterion keep
//! discovery order, so the earliest discovered one wins. Only the reference
//! index changes: member order is untouched, which makes the operation
//! idempotent for fixed criteria and membership.
//!
//! # Example
//!
//! ```
//! use dupemark::results::{reprioritize, Criterion, Direction, ResultsBuilder, ScannedFile};
//!
//! let mut groups = ResultsBuilder::new()
//!     .group(vec![
//!         ScannedFile::new("/a", 10),
//!         ScannedFile::new("/b", 50),
//!         ScannedFile::new("/c", 20),
//!     ])
//!     .build();
//!
//! let changed = reprioritize(&mut groups, &[Criterion::Size { prefer: Direction::Highest }], None);
//! assert_eq!(changed, 1);
//! assert_eq!(groups[0].reference().path().to_str(), Some("/b"));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::directories::{Directories, DirectoryState};
use super::file::FileRef;
use super::group::DuplicateGroup;

/// Which end of a numeric or lexical scale is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Lowest,
    Highest,
}

impl Direction {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Lowest => ordering,
            Self::Highest => ordering.reverse(),
        }
    }
}

/// One rule for choosing a reference file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    /// Number of path components.
    PathDepth { prefer: Direction },
    /// Modification time. Files with an unknown time sort as oldest.
    Modified { prefer: Direction },
    /// File size in bytes.
    Size { prefer: Direction },
    /// File name, case-insensitive.
    FileName { prefer: Direction },
    /// Files under earlier folders in the list win; unlisted folders lose.
    FolderPriority { folders: Vec<PathBuf> },
    /// Files in `Reference` directories win.
    ReferenceDirsFirst,
}

impl Criterion {
    /// Compare two files; `Less` means `a` is the better reference.
    #[must_use]
    pub fn compare(&self, a: &FileRef, b: &FileRef, dirs: Option<&Directories>) -> Ordering {
        match self {
            Self::PathDepth { prefer } => prefer.apply(a.depth().cmp(&b.depth())),
            Self::Modified { prefer } => prefer.apply(a.modified().cmp(&b.modified())),
            Self::Size { prefer } => prefer.apply(a.size().cmp(&b.size())),
            Self::FileName { prefer } => prefer.apply(
                a.file_name()
                    .to_lowercase()
                    .cmp(&b.file_name().to_lowercase()),
            ),
            Self::FolderPriority { folders } => {
                folder_rank(folders, a).cmp(&folder_rank(folders, b))
            }
            Self::ReferenceDirsFirst => match dirs {
                Some(dirs) => {
                    let is_ref =
                        |f: &FileRef| dirs.state_of_file(f.path()) == DirectoryState::Reference;
                    // true sorts after false, so compare b against a
                    is_ref(b).cmp(&is_ref(a))
                }
                None => Ordering::Equal,
            },
        }
    }
}

fn folder_rank(folders: &[PathBuf], file: &FileRef) -> usize {
    folders
        .iter()
        .position(|folder| file.path().starts_with(folder))
        .unwrap_or(folders.len())
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = |d: &Direction| match d {
            Direction::Lowest => "lowest",
            Direction::Highest => "highest",
        };
        match self {
            Self::PathDepth { prefer } => write!(f, "depth:{}", dir(prefer)),
            Self::Modified { prefer } => write!(f, "mtime:{}", dir(prefer)),
            Self::Size { prefer } => write!(f, "size:{}", dir(prefer)),
            Self::FileName { prefer } => write!(f, "name:{}", dir(prefer)),
            Self::FolderPriority { folders } => {
                let list: Vec<String> = folders
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                write!(f, "folder:{}", list.join(","))
            }
            Self::ReferenceDirsFirst => write!(f, "reference-dirs"),
        }
    }
}

impl FromStr for Criterion {
    type Err = String;

    /// Parse `kind[:argument]`, e.g. `size:highest`, `mtime`, `folder:/a,/b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };

        let prefer = || -> Result<Direction, String> {
            match arg.map(|a| a.trim().to_lowercase()).as_deref() {
                None | Some("lowest") | Some("low") | Some("min") => Ok(Direction::Lowest),
                Some("highest") | Some("high") | Some("max") => Ok(Direction::Highest),
                Some(other) => Err(format!(
                    "Invalid direction '{}'. Expected 'lowest' or 'highest'",
                    other
                )),
            }
        };

        match kind.to_lowercase().as_str() {
            "depth" | "path-depth" => Ok(Self::PathDepth { prefer: prefer()? }),
            "mtime" | "modified" => Ok(Self::Modified { prefer: prefer()? }),
            "size" => Ok(Self::Size { prefer: prefer()? }),
            "name" | "filename" => Ok(Self::FileName { prefer: prefer()? }),
            "folder" => {
                let folders: Vec<PathBuf> = arg
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect();
                if folders.is_empty() {
                    return Err("folder criterion needs at least one folder".to_string());
                }
                Ok(Self::FolderPriority { folders })
            }
            "reference-dirs" | "ref" => Ok(Self::ReferenceDirsFirst),
            other => Err(format!(
                "Unknown criterion '{}'. Expected one of: depth, mtime, size, name, folder, reference-dirs",
                other
            )),
        }
    }
}

/// Index of the member that best satisfies `criteria`.
fn best_member(group: &DuplicateGroup, criteria: &[Criterion], dirs: Option<&Directories>) -> usize {
    group
        .members()
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| {
            criteria
                .iter()
                .map(|c| c.compare(a, b, dirs))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| ia.cmp(ib))
        })
        .map_or(0, |(i, _)| i)
}

/// Pick a new reference for every group.
///
/// Returns the number of groups whose reference changed. An empty criteria
/// list changes nothing.
pub fn reprioritize(
    groups: &mut [DuplicateGroup],
    criteria: &[Criterion],
    dirs: Option<&Directories>,
) -> usize {
    if criteria.is_empty() {
        log::debug!("Reprioritize called without criteria, nothing to do");
        return 0;
    }

    let mut changed = 0;
    for group in groups.iter_mut() {
        let best = best_member(group, criteria, dirs);
        if best != group.reference_index() {
            log::debug!(
                "Group {}: reference {} -> {}",
                group.id(),
                group.reference().path().display(),
                group.members()[best].path().display()
            );
            group.set_reference_index(best);
            changed += 1;
        }
    }

    log::info!(
        "Reprioritized {} groups by [{}]: {} references changed",
        groups.len(),
        criteria
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        changed
    );
    changed
}
