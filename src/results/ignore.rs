//! Persistent list of file pairs excluded from results.
//!
//! Pairs are unordered: ignoring `(a, b)` also ignores `(b, a)`. The list
//! outlives any single set of results and is applied to every new one. It
//! only grows through [`IgnoreList::add`] and shrinks through explicit
//! removal.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::file::FileKey;
use super::group::{DuplicateGroup, Removal};

/// Current version of the ignore list file format.
pub const IGNORE_LIST_VERSION: u32 = 1;

/// Unordered pairs of paths that must not be reported as duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreList {
    pairs: BTreeSet<(PathBuf, PathBuf)>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IgnoreFile {
    version: u32,
    #[serde(flatten)]
    list: IgnoreList,
}

fn ordered(a: &Path, b: &Path) -> (PathBuf, PathBuf) {
    if a <= b {
        (a.to_path_buf(), b.to_path_buf())
    } else {
        (b.to_path_buf(), a.to_path_buf())
    }
}

impl IgnoreList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore a pair. Returns `false` if it was already ignored.
    pub fn add(&mut self, a: &Path, b: &Path) -> bool {
        self.pairs.insert(ordered(a, b))
    }

    /// Stop ignoring a pair. Returns `false` if it was not ignored.
    pub fn remove(&mut self, a: &Path, b: &Path) -> bool {
        self.pairs.remove(&ordered(a, b))
    }

    #[must_use]
    pub fn contains(&self, a: &Path, b: &Path) -> bool {
        self.pairs.contains(&ordered(a, b))
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.pairs.iter().map(|(a, b)| (a.as_path(), b.as_path()))
    }

    /// Remove ignored members from fresh results.
    ///
    /// A member is removed when its pair with the group's reference is
    /// ignored. Groups left with fewer than two members are dropped.
    /// Returns the number of files removed.
    pub fn apply(&self, groups: &mut Vec<DuplicateGroup>) -> usize {
        if self.is_empty() {
            return 0;
        }

        let mut removed = 0;
        for group in groups.iter_mut() {
            let reference = group.reference().path().to_path_buf();
            let ignored: Vec<FileKey> = group
                .duplicates()
                .filter(|m| self.contains(&reference, m.path()))
                .map(|m| m.key())
                .collect();
            for key in ignored {
                if let Ok(removal) = group.remove(key) {
                    removed += 1;
                    if removal == Removal::Dissolved {
                        break;
                    }
                }
            }
        }

        let before = groups.len();
        groups.retain(|g| !g.is_dissolved());
        if removed > 0 {
            log::info!(
                "Ignore list removed {} file(s), {} group(s) dropped",
                removed,
                before - groups.len()
            );
        }
        removed
    }

    /// Default location of the ignore list file.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupemark", "dupemark")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.data_dir().join("ignore_list.json"))
    }

    /// Load the list from `path`. A missing file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// has an unsupported version.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read ignore list: {}", path.display()))?;
        let file: IgnoreFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ignore list: {}", path.display()))?;
        if file.version != IGNORE_LIST_VERSION {
            anyhow::bail!(
                "Unsupported ignore list version: {}. Current version is {}.",
                file.version,
                IGNORE_LIST_VERSION
            );
        }
        log::debug!("Loaded {} ignored pair(s) from {}", file.list.len(), path.display());
        Ok(file.list)
    }

    /// Load the list, falling back to an empty one if the file is unusable.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Ignoring unreadable ignore list, starting empty: {:#}", e);
                Self::default()
            }
        }
    }

    /// Save the list to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = IgnoreFile {
            version: IGNORE_LIST_VERSION,
            list: self.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write ignore list: {}", path.display()))?;
        log::debug!("Saved {} ignored pair(s) to {}", self.len(), path.display());
        Ok(())
    }
}
