//! File references held by duplicate groups.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Stable identifier for a file within one set of results.
///
/// Keys are assigned when results are loaded and never reused for another
/// file while those results are alive. Renaming a file keeps its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(u64);

impl FileKey {
    /// Wrap a raw key value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file that belongs to a duplicate group.
///
/// Immutable once created; a rename produces a new `FileRef` with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    key: FileKey,
    path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

impl FileRef {
    /// Create a new file reference.
    ///
    /// # Arguments
    ///
    /// * `key` - Stable key for this file
    /// * `path` - Path to the file
    /// * `size` - File size in bytes at scan time
    /// * `modified` - Last modification time at scan time, if known
    #[must_use]
    pub fn new(key: FileKey, path: PathBuf, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            key,
            path,
            size,
            modified,
        }
    }

    #[must_use]
    pub fn key(&self) -> FileKey {
        self.key
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Final path component, used for name-based ordering.
    #[must_use]
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map_or_else(|| self.path.to_string_lossy(), |n| n.to_string_lossy())
    }

    /// Text the filter matches against: the full path.
    #[must_use]
    pub fn display_text(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    /// Number of path components.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.components().count()
    }

    /// Same file under a new path (after an on-disk rename).
    #[must_use]
    pub fn with_path(&self, path: PathBuf) -> Self {
        Self {
            path,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_display() {
        assert_eq!(FileKey::new(42).to_string(), "#42");
        assert_eq!(FileKey::new(42).get(), 42);
    }

    #[test]
    fn test_file_ref_accessors() {
        let file = FileRef::new(FileKey::new(1), PathBuf::from("/data/a/photo.jpg"), 10, None);

        assert_eq!(file.key(), FileKey::new(1));
        assert_eq!(file.size(), 10);
        assert_eq!(file.file_name(), "photo.jpg");
        assert_eq!(file.depth(), 4);
        assert!(file.modified().is_none());
    }

    #[test]
    fn test_with_path_keeps_key() {
        let file = FileRef::new(FileKey::new(9), PathBuf::from("/x/old.txt"), 5, None);
        let renamed = file.with_path(PathBuf::from("/x/new.txt"));

        assert_eq!(renamed.key(), file.key());
        assert_eq!(renamed.size(), 5);
        assert_eq!(renamed.file_name(), "new.txt");
    }
}
