//! JSON output formatter for the current results view.
//!
//! Provides machine-readable JSON output for scripting and automation.
//! Only groups and files visible through the engine's filter are written.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "id": 0,
//!       "files": [
//!         { "path": "/a.txt", "size": 1024, "modified": "2024-01-01T00:00:00Z",
//!           "reference": true, "marked": false }
//!       ]
//!     }
//!   ],
//!   "stats": { "groups": 1, "files": 2, "marked": 1, "marked_bytes": 1024,
//!              "reclaimable_bytes": 1024 },
//!   "filter": { "query": "", "delta_only": false }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{Engine, Stats};
use crate::results::{FileRef, GroupView, MarkSet};

/// One file of a visible group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    pub path: String,
    pub size: u64,
    /// Modification time recorded at scan (RFC 3339)
    pub modified: Option<String>,
    pub reference: bool,
    pub marked: bool,
}

/// A visible duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    pub id: usize,
    pub files: Vec<JsonFile>,
}

/// Filter the output was produced under.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFilter {
    pub query: String,
    pub delta_only: bool,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub groups: Vec<JsonGroup>,
    /// Totals over all results, not just the visible ones
    pub stats: Stats,
    pub filter: JsonFilter,
}

pub(crate) fn rfc3339(file: &FileRef) -> Option<String> {
    file.modified()
        .map(|m| DateTime::<Utc>::from(m).to_rfc3339())
}

impl JsonGroup {
    fn from_view(view: &GroupView<'_>, marks: &MarkSet) -> Self {
        Self {
            id: view.group.id().get(),
            files: view
                .members
                .iter()
                .map(|f| JsonFile {
                    path: f.display_text().into_owned(),
                    size: f.size(),
                    modified: rfc3339(f),
                    reference: view.group.is_reference(f.key()),
                    marked: marks.is_marked(f.key()),
                })
                .collect(),
        }
    }
}

impl JsonOutput {
    /// Capture the engine's current projection.
    #[must_use]
    pub fn new(engine: &Engine) -> Self {
        let filter = engine.filter();
        Self {
            groups: engine
                .projection()
                .iter()
                .map(|view| JsonGroup::from_view(&view, engine.marks()))
                .collect(),
            stats: engine.stats(),
            filter: JsonFilter {
                query: filter.query().to_string(),
                delta_only: filter.delta_only(),
            },
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
