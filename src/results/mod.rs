//! Duplicate results: groups, marks and views over them.
//!
//! This module provides the building blocks the [`Engine`](crate::engine::Engine)
//! coordinates:
//! - [`DuplicateGroup`]: ordered members plus one reference file
//! - [`MarkSet`]: which files are marked, never emptying a group
//! - [`FilterState`] / [`Projection`]: read-only filtered view
//! - [`PowerMarker`]: automatic "mark all but the reference" mode
//! - [`reprioritize`]: re-pick references by chained [`Criterion`]s
//! - [`IgnoreList`]: persisted pairs excluded from results
//! - [`Directories`]: per-folder Normal/Reference/Excluded states

pub mod directories;
pub mod file;
pub mod filter;
pub mod group;
pub mod ignore;
pub mod marks;
pub mod power_marker;
pub mod prioritize;

// Re-export main types
pub use directories::{Directories, DirectoryError, DirectoryState};
pub use file::{FileKey, FileRef};
pub use filter::{FilterState, GroupView, Projection, ProjectionIter};
pub use group::{DuplicateGroup, GroupId, Removal, ResultsBuilder, ScannedFile};
pub use ignore::IgnoreList;
pub use marks::MarkSet;
pub use power_marker::PowerMarker;
pub use prioritize::{reprioritize, Criterion, Direction};
