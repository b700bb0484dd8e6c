//! File operations applied to individual files.
//!
//! # Overview
//!
//! [`FileOperations`] is the seam between the engine and the filesystem. It
//! reports expected conditions (missing file, permission problems, name
//! collisions) as a typed [`FileOpError`] instead of panicking, one result
//! per call. [`LocalFileOps`] is the real implementation:
//! - Delete to system trash (default, recoverable) or permanently
//! - Move and copy into a destination directory
//! - Rename in place
//! - Reveal in the platform file manager
//!
//! # Safety
//!
//! With mtime verification on (the default), a file whose size or
//! modification time changed since the scan is refused with
//! [`FileOpError::Modified`] before any destructive step.
//!
//! # Example
//!
//! ```no_run
//! use dupemark::actions::{DeleteOptions, FileOperations, LocalFileOps};
//! use dupemark::results::{FileKey, FileRef};
//! use std::path::PathBuf;
//!
//! let file = FileRef::new(FileKey::new(0), PathBuf::from("/tmp/dup.txt"), 12, None);
//! let ops = LocalFileOps::new();
//! match ops.delete(&file, &DeleteOptions::default()) {
//!     Ok(()) => println!("Moved to trash"),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::results::FileRef;

/// Error type for single-file operations.
#[derive(Debug, Error)]
pub enum FileOpError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan (TOCTOU protection).
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// The target path of a move, copy or rename already exists.
    #[error("target already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The new name for a rename is not a plain file name.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    Trash { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FileOpError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::AlreadyExists(p)
            | Self::Trash { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::InvalidName(_) => None,
        }
    }

    /// Whether the file was already gone.
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Per-file deletion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Route through the recoverable system trash instead of deleting.
    pub use_trash: bool,
    /// Skip files inside an excluded directory.
    pub direct_only: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            use_trash: true,
            direct_only: false,
        }
    }
}

impl DeleteOptions {
    /// Options for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self::default()
    }

    /// Options for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self {
            use_trash: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_direct_only(mut self, direct_only: bool) -> Self {
        self.direct_only = direct_only;
        self
    }
}

/// Filesystem operations used by the engine.
///
/// Implementations must be callable from a worker thread.
pub trait FileOperations: Send + Sync {
    /// Delete a file, to trash or permanently per `options.use_trash`.
    fn delete(&self, file: &FileRef, options: &DeleteOptions) -> Result<(), FileOpError>;

    /// Move a file into `dest_dir`, returning its new path.
    fn move_to(&self, file: &FileRef, dest_dir: &Path) -> Result<PathBuf, FileOpError>;

    /// Copy a file into `dest_dir`, returning the copy's path.
    fn copy_to(&self, file: &FileRef, dest_dir: &Path) -> Result<PathBuf, FileOpError>;

    /// Rename a file within its directory, returning its new path.
    fn rename(&self, file: &FileRef, new_name: &str) -> Result<PathBuf, FileOpError>;

    /// Show the file in the platform file manager.
    fn reveal(&self, file: &FileRef) -> Result<(), FileOpError>;
}

/// File metadata snapshot for TOCTOU verification.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Capture a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, FileOpError> {
        let metadata = fs::metadata(path).map_err(|e| FileOpError::from_io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Check the snapshot against what the scan recorded.
    ///
    /// # Errors
    ///
    /// Returns `Modified` if size or mtime differ.
    pub fn verify_against(&self, file: &FileRef) -> Result<(), FileOpError> {
        if let (Some(expected), Some(actual)) = (file.modified(), self.mtime) {
            if expected != actual {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(FileOpError::Modified(self.path.clone()));
            }
        }
        if file.size() != self.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                file.size(),
                self.size
            );
            return Err(FileOpError::Modified(self.path.clone()));
        }
        Ok(())
    }
}

/// [`FileOperations`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileOps {
    verify_mtime: bool,
}

impl Default for LocalFileOps {
    fn default() -> Self {
        Self { verify_mtime: true }
    }
}

impl LocalFileOps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable TOCTOU verification.
    #[must_use]
    pub fn with_verify_mtime(mut self, verify: bool) -> Self {
        self.verify_mtime = verify;
        self
    }

    /// Make sure the file is still there and, if enabled, unchanged.
    fn check(&self, file: &FileRef) -> Result<FileSnapshot, FileOpError> {
        let snapshot = FileSnapshot::capture(file.path())?;
        if self.verify_mtime {
            snapshot.verify_against(file)?;
        }
        Ok(snapshot)
    }

    fn target_in(dest_dir: &Path, file: &FileRef) -> Result<PathBuf, FileOpError> {
        let name = file
            .path()
            .file_name()
            .ok_or_else(|| FileOpError::InvalidName(file.display_text().into_owned()))?;
        fs::create_dir_all(dest_dir).map_err(|e| FileOpError::from_io(dest_dir, e))?;
        Ok(dest_dir.join(name))
    }
}

/// Errors at the target side never mean the source is gone.
fn target_error(target: &Path, e: io::Error) -> FileOpError {
    if e.kind() == io::ErrorKind::AlreadyExists {
        FileOpError::AlreadyExists(target.to_path_buf())
    } else {
        FileOpError::Io {
            path: target.to_path_buf(),
            source: e,
        }
    }
}

/// Copy `path` into a new file at `target`, never replacing an existing one.
///
/// A failed copy removes the partial target.
fn copy_new(path: &Path, target: &Path) -> Result<(), FileOpError> {
    let mut source = fs::File::open(path).map_err(|e| FileOpError::from_io(path, e))?;
    let mut dest = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|e| target_error(target, e))?;

    if let Err(e) = io::copy(&mut source, &mut dest) {
        drop(dest);
        if let Err(cleanup) = fs::remove_file(target) {
            log::warn!("Could not remove partial copy {}: {}", target.display(), cleanup);
        }
        return Err(FileOpError::from_io(path, e));
    }
    if let Ok(metadata) = source.metadata() {
        let _ = dest.set_permissions(metadata.permissions());
        if let Ok(modified) = metadata.modified() {
            let _ = dest.set_modified(modified);
        }
    }
    Ok(())
}

/// Give `path` a second name at `target` without replacing anything there.
///
/// Falls back to [`copy_new`] where hard links are not possible, such as
/// across filesystems.
fn link_or_copy(path: &Path, target: &Path) -> Result<(), FileOpError> {
    match fs::hard_link(path, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(FileOpError::AlreadyExists(target.to_path_buf()))
        }
        Err(e) => {
            log::debug!("Cannot link {} ({}), copying instead", path.display(), e);
            copy_new(path, target)
        }
    }
}

/// Drop the old name once `target` holds the file.
fn remove_source(path: &Path, target: &Path) -> Result<(), FileOpError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("{} vanished during the move, kept {}", path.display(), target.display());
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(target);
            Err(FileOpError::from_io(path, e))
        }
    }
}

impl FileOperations for LocalFileOps {
    fn delete(&self, file: &FileRef, options: &DeleteOptions) -> Result<(), FileOpError> {
        let path = file.path();
        let snapshot = self.check(file)?;

        if options.use_trash {
            trash::delete(path).map_err(|e| {
                log::error!("Trash operation failed for {}: {}", path.display(), e);
                FileOpError::Trash {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            log::info!("Moved to trash: {} ({} bytes)", path.display(), snapshot.size);
        } else {
            fs::remove_file(path).map_err(|e| {
                log::error!("Permanent delete failed for {}: {}", path.display(), e);
                FileOpError::from_io(path, e)
            })?;
            log::info!("Permanently deleted: {} ({} bytes)", path.display(), snapshot.size);
        }
        Ok(())
    }

    fn move_to(&self, file: &FileRef, dest_dir: &Path) -> Result<PathBuf, FileOpError> {
        let path = file.path();
        self.check(file)?;
        let target = Self::target_in(dest_dir, file)?;

        link_or_copy(path, &target)?;
        remove_source(path, &target)?;

        log::info!("Moved {} -> {}", path.display(), target.display());
        Ok(target)
    }

    fn copy_to(&self, file: &FileRef, dest_dir: &Path) -> Result<PathBuf, FileOpError> {
        let path = file.path();
        FileSnapshot::capture(path)?;
        let target = Self::target_in(dest_dir, file)?;

        copy_new(path, &target)?;
        log::info!("Copied {} -> {}", path.display(), target.display());
        Ok(target)
    }

    fn rename(&self, file: &FileRef, new_name: &str) -> Result<PathBuf, FileOpError> {
        let path = file.path();
        let trimmed = new_name.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(['/', '\\'])
        {
            return Err(FileOpError::InvalidName(new_name.to_string()));
        }
        FileSnapshot::capture(path)?;

        let target = path.with_file_name(trimmed);
        match fs::hard_link(path, &target) {
            Ok(()) => remove_source(path, &target)?,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FileOpError::AlreadyExists(target));
            }
            Err(e) => {
                // No link support here: a plain rename, checked first
                log::debug!("Cannot link {} ({}), renaming", path.display(), e);
                if target.exists() {
                    return Err(FileOpError::AlreadyExists(target));
                }
                fs::rename(path, &target).map_err(|e| FileOpError::from_io(path, e))?;
            }
        }
        log::info!("Renamed {} -> {}", path.display(), target.display());
        Ok(target)
    }

    fn reveal(&self, file: &FileRef) -> Result<(), FileOpError> {
        let path = file.path();
        FileSnapshot::capture(path)?;

        let mut command = if cfg!(target_os = "macos") {
            let mut c = Command::new("open");
            c.arg("-R").arg(path);
            c
        } else if cfg!(windows) {
            let mut c = Command::new("explorer");
            c.arg(format!("/select,{}", path.display()));
            c
        } else {
            let mut c = Command::new("xdg-open");
            c.arg(path.parent().unwrap_or(path));
            c
        };

        let status = command.status().map_err(|e| FileOpError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        // explorer exits with 1 even when it opened the window
        if !status.success() && !cfg!(windows) {
            return Err(FileOpError::Io {
                path: path.to_path_buf(),
                source: io::Error::other(format!(
                    "{} exited with {}",
                    command.get_program().to_string_lossy(),
                    status
                )),
            });
        }
        log::debug!("Revealed {}", path.display());
        Ok(())
    }
}
