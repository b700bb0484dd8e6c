//! File actions module.
//!
//! This module provides functionality for:
//! - Single-file operations behind the [`FileOperations`] trait
//! - Batch execution over marked files with per-file outcomes
//!
//! # Operations
//!
//! [`LocalFileOps`] implements delete (trash by default, or permanent),
//! move, copy, rename and reveal on the local filesystem, with TOCTOU
//! verification against the size and mtime recorded at scan time.
//!
//! # Batches
//!
//! [`ActionBatch`] applies one [`ActionKind`] to a snapshot of files and
//! never aborts on a single failure:
//!
//! ```no_run
//! use dupemark::actions::{ActionBatch, ActionKind, DeleteOptions, LocalFileOps};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let batch = ActionBatch::new(
//!     ActionKind::Delete(DeleteOptions::trash()),
//!     Vec::new(),
//!     Arc::new(AtomicBool::new(false)),
//! );
//! let report = batch.run(&LocalFileOps::new());
//! println!("{}", report.summary());
//! ```

pub mod executor;
pub mod ops;

// Re-export commonly used types
pub use executor::{
    ActionBatch, ActionKind, ActionOutcome, ActionProgressCallback, BatchReport, FileOutcome,
    SkipReason,
};
pub use ops::{DeleteOptions, FileOpError, FileOperations, FileSnapshot, LocalFileOps};
