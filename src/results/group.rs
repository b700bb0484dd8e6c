//! Duplicate groups and their reference file.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] is an ordered list of files judged equivalent by the
//! scanner, in discovery order, plus one designated reference file: the copy
//! treated as the original. A group always holds at least two files when it
//! is created. Removing members can shrink it to one, at which point it is
//! dissolved and the owner drops it from the results.
//!
//! [`ResultsBuilder`] turns raw scanner output into groups, assigning stable
//! [`FileKey`]s and dropping groups that are too small to be duplicates.
//!
//! # Example
//!
//! ```
//! use dupemark::results::{ResultsBuilder, ScannedFile};
//!
//! let groups = ResultsBuilder::new()
//!     .group(vec![
//!         ScannedFile::new("/photos/a.jpg", 1024),
//!         ScannedFile::new("/backup/a.jpg", 1024),
//!     ])
//!     .group(vec![ScannedFile::new("/lonely.txt", 10)]) // dropped: singleton
//!     .build();
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].reference().path().to_str(), Some("/photos/a.jpg"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::file::{FileKey, FileRef};
use crate::error::EngineError;

/// Identifier of a duplicate group within one set of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(usize);

impl GroupId {
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to a group when a member was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The member was removed and the group still has duplicates.
    Removed,
    /// The group is down to a single file and no longer a duplicate group.
    Dissolved,
}

/// Confirmed duplicate group of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    id: GroupId,
    members: Vec<FileRef>,
    reference: usize,
}

impl DuplicateGroup {
    /// Create a new group whose reference is the first member.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGroup` if there are fewer than two members or a key
    /// appears twice.
    pub fn new(id: GroupId, members: Vec<FileRef>) -> Result<Self, EngineError> {
        Self::with_reference(id, members, 0)
    }

    /// Create a new group with an explicit reference index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGroup` if there are fewer than two members, a key
    /// appears twice, or `reference` is out of range.
    pub fn with_reference(
        id: GroupId,
        members: Vec<FileRef>,
        reference: usize,
    ) -> Result<Self, EngineError> {
        if members.len() < 2 {
            return Err(EngineError::InvalidGroup(format!(
                "group {} has {} member(s), at least 2 required",
                id,
                members.len()
            )));
        }
        if reference >= members.len() {
            return Err(EngineError::InvalidGroup(format!(
                "group {} reference index {} out of range",
                id, reference
            )));
        }
        let mut seen = HashSet::with_capacity(members.len());
        if let Some(dup) = members.iter().find(|m| !seen.insert(m.key())) {
            return Err(EngineError::InvalidGroup(format!(
                "group {} lists file {} twice",
                id,
                dup.key()
            )));
        }

        Ok(Self {
            id,
            members,
            reference,
        })
    }

    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The file treated as the original.
    #[must_use]
    pub fn reference(&self) -> &FileRef {
        &self.members[self.reference]
    }

    #[must_use]
    pub fn reference_index(&self) -> usize {
        self.reference
    }

    /// Members in discovery order.
    #[must_use]
    pub fn members(&self) -> &[FileRef] {
        &self.members
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A group with fewer than two members holds no duplicates.
    #[must_use]
    pub fn is_dissolved(&self) -> bool {
        self.members.len() < 2
    }

    #[must_use]
    pub fn position(&self, key: FileKey) -> Option<usize> {
        self.members.iter().position(|m| m.key() == key)
    }

    #[must_use]
    pub fn contains(&self, key: FileKey) -> bool {
        self.position(key).is_some()
    }

    #[must_use]
    pub fn member(&self, key: FileKey) -> Option<&FileRef> {
        self.members.iter().find(|m| m.key() == key)
    }

    #[must_use]
    pub fn is_reference(&self, key: FileKey) -> bool {
        self.reference().key() == key
    }

    /// Members other than the reference, in discovery order.
    pub fn duplicates(&self) -> impl Iterator<Item = &FileRef> {
        let reference = self.reference;
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != reference)
            .map(|(_, m)| m)
    }

    /// Make `key` the reference file.
    ///
    /// # Errors
    ///
    /// Returns `NotAMember` if the file is not in this group.
    pub fn set_reference(&mut self, key: FileKey) -> Result<(), EngineError> {
        let index = self.position(key).ok_or(EngineError::NotAMember {
            group: self.id,
            file: key,
        })?;
        self.reference = index;
        Ok(())
    }

    pub(crate) fn set_reference_index(&mut self, index: usize) {
        debug_assert!(index < self.members.len());
        self.reference = index;
    }

    /// Remove a member.
    ///
    /// Removing the reference hands the role to the first remaining member.
    /// The last member is never removed, so a group is never empty.
    ///
    /// # Errors
    ///
    /// Returns `NotAMember` if the file is not in this group.
    pub fn remove(&mut self, key: FileKey) -> Result<Removal, EngineError> {
        let index = self.position(key).ok_or(EngineError::NotAMember {
            group: self.id,
            file: key,
        })?;
        if self.members.len() == 1 {
            return Ok(Removal::Dissolved);
        }

        self.members.remove(index);
        if index == self.reference {
            self.reference = 0;
        } else if index < self.reference {
            self.reference -= 1;
        }

        if self.is_dissolved() {
            log::debug!("Group {} dissolved", self.id);
            Ok(Removal::Dissolved)
        } else {
            Ok(Removal::Removed)
        }
    }

    /// Replace a member in place, keeping its position and key.
    pub(crate) fn replace(&mut self, file: FileRef) -> Result<(), EngineError> {
        let index = self.position(file.key()).ok_or(EngineError::NotAMember {
            group: self.id,
            file: file.key(),
        })?;
        self.members[index] = file;
        Ok(())
    }

    /// Whether members differ in size (the "delta" view).
    #[must_use]
    pub fn has_size_delta(&self) -> bool {
        let first = self.members[0].size();
        self.members.iter().any(|m| m.size() != first)
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.members.iter().map(FileRef::size).sum()
    }

    /// Space freed by removing every copy but the reference.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.total_size().saturating_sub(self.reference().size())
    }
}

/// A file as reported by the scanner, before it has a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl ScannedFile {
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
        self.modified = Some(modified);
        self
    }
}

/// Builds duplicate groups from scanner output.
///
/// Keys are assigned in insertion order across all groups. Groups with fewer
/// than two files are dropped, as are files whose path already appeared.
#[derive(Debug, Default)]
pub struct ResultsBuilder {
    next_key: u64,
    groups: Vec<DuplicateGroup>,
    seen_paths: HashSet<PathBuf>,
    dropped: usize,
}

impl ResultsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group whose reference is its first file.
    #[must_use]
    pub fn group(self, files: impl IntoIterator<Item = ScannedFile>) -> Self {
        self.group_with_reference(files, 0)
    }

    /// Add a group with an explicit reference index.
    ///
    /// An out-of-range index falls back to the first file.
    #[must_use]
    pub fn group_with_reference(
        mut self,
        files: impl IntoIterator<Item = ScannedFile>,
        reference: usize,
    ) -> Self {
        let mut members = Vec::new();
        for file in files {
            if !self.seen_paths.insert(file.path.clone()) {
                log::warn!(
                    "Skipping {}: already part of another group",
                    file.path.display()
                );
                continue;
            }
            let key = FileKey::new(self.next_key);
            self.next_key += 1;
            members.push(FileRef::new(key, file.path, file.size, file.modified));
        }

        let id = GroupId::new(self.groups.len() + self.dropped);
        let reference = if reference < members.len() {
            reference
        } else {
            log::warn!("Group {} reference index {} out of range", id, reference);
            0
        };

        match DuplicateGroup::with_reference(id, members, reference) {
            Ok(group) => self.groups.push(group),
            Err(e) => {
                log::debug!("Dropping group: {}", e);
                self.dropped += 1;
            }
        }
        self
    }

    /// Number of groups dropped so far for being too small.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[must_use]
    pub fn build(self) -> Vec<DuplicateGroup> {
        self.groups
    }
}
