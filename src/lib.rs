//! dupemark - review, mark and act on duplicate file groups
//!
//! The library holds the duplicate group & marking engine: groups with a
//! reference file, a mark set that never empties a group, a filtered view,
//! the power marker, reprioritization, the ignore list and file actions
//! that can run on a worker thread. The `dupemark` binary drives it over
//! session files.

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod results;
pub mod session;
pub mod signal;

pub use app::run_app;
