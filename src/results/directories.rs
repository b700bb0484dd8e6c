//! Scanned directories and their states.
//!
//! Each root directory, and any folder below it, is `Normal`, `Reference`
//! (files there are preferred as originals) or `Excluded`. A folder without
//! an explicit state inherits the state of its nearest listed ancestor;
//! hidden folders default to `Excluded`. Only states that differ from the
//! inherited one are stored.
//!
//! # Example
//!
//! ```no_run
//! use dupemark::results::{Directories, DirectoryState};
//! use std::path::Path;
//!
//! let mut dirs = Directories::new();
//! dirs.add_path(Path::new("/home/me/photos")).unwrap();
//! dirs.set_state(Path::new("/home/me/photos/originals"), DirectoryState::Reference);
//!
//! assert_eq!(
//!     dirs.get_state(Path::new("/home/me/photos/originals/2019")),
//!     DirectoryState::Reference
//! );
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State of a directory for scanning and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryState {
    #[default]
    Normal,
    Reference,
    Excluded,
}

/// Errors from adding a root directory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The path is already covered by a root.
    #[error("{0} is already in the directory list")]
    AlreadyThere(PathBuf),

    /// The path does not exist.
    #[error("{0} does not exist")]
    InvalidPath(PathBuf),
}

/// Root directories plus explicit per-folder states.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directories {
    roots: Vec<PathBuf>,
    states: BTreeMap<PathBuf, DirectoryState>,
}

impl Directories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `path` is a root or lies under one.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.roots.iter().any(|root| path.starts_with(root))
    }

    /// Add a root directory.
    ///
    /// Existing roots under `path` are absorbed by it.
    ///
    /// # Errors
    ///
    /// - `AlreadyThere` if `path` is already covered by a root
    /// - `InvalidPath` if `path` does not exist
    pub fn add_path(&mut self, path: &Path) -> Result<(), DirectoryError> {
        if self.contains(path) {
            return Err(DirectoryError::AlreadyThere(path.to_path_buf()));
        }
        if !path.exists() {
            return Err(DirectoryError::InvalidPath(path.to_path_buf()));
        }
        self.roots.retain(|root| !root.starts_with(path));
        self.roots.push(path.to_path_buf());
        Ok(())
    }

    /// Remove a root directory. Returns `false` if it was not a root.
    pub fn remove_root(&mut self, path: &Path) -> bool {
        let before = self.roots.len();
        self.roots.retain(|root| root != path);
        before != self.roots.len()
    }

    /// Effective state of a directory.
    #[must_use]
    pub fn get_state(&self, path: &Path) -> DirectoryState {
        if let Some(state) = self.states.get(path) {
            return *state;
        }
        if is_hidden(path) {
            return DirectoryState::Excluded;
        }
        match path.parent() {
            Some(parent) if self.contains(parent) => self.get_state(parent),
            _ => DirectoryState::Normal,
        }
    }

    /// Effective state of the directory holding `file`.
    #[must_use]
    pub fn state_of_file(&self, file: &Path) -> DirectoryState {
        file.parent()
            .map_or(DirectoryState::Normal, |parent| self.get_state(parent))
    }

    /// Set a directory's state, storing it only if it differs from what the
    /// directory would inherit.
    pub fn set_state(&mut self, path: &Path, state: DirectoryState) {
        if self.get_state(path) == state {
            return;
        }
        if self.states.remove(path).is_some() && self.get_state(path) == state {
            return;
        }
        self.states.insert(path.to_path_buf(), state);
    }

    /// Load directories from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read directories file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse directories file: {}", path.display()))
    }

    /// Save directories to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write directories file: {}", path.display()))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
