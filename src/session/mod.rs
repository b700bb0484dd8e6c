//! Session module for persisting duplicate results and review state.
//!
//! A session is how scan results reach the engine and how marks, references
//! and the power marker survive between runs.
//!
//! # Features
//!
//! * **Persistence**: Save duplicate groups, reference choices and marks to JSON.
//! * **Integrity**: Each session file is wrapped in an envelope with a SHA256 checksum.
//! * **Versioning**: Unknown format versions are rejected on load.
//!
//! # Architecture
//!
//! * [`data`]: Serializable models and conversion to and from the engine.
//! * [`io`]: Logic for saving, loading, and verifying session files.

pub mod data;
pub mod io;

pub use data::{Session, SessionFile, SessionGroup, SESSION_VERSION};
