//! CSV output formatter for the current results view.
//!
//! Provides machine-readable CSV output for spreadsheets and data analysis.
//! One row is generated for each visible file.
//!
//! # Columns
//!
//! - `group_id`: Numeric ID identifying the duplicate group
//! - `reference`: Whether the file is its group's reference
//! - `marked`: Whether the file is marked for action
//! - `path`: Path to the file
//! - `size`: File size in bytes
//! - `modified`: Modification time recorded at scan (RFC 3339, empty if unknown)

use std::io;

use serde::Serialize;
use thiserror::Error;

use super::json::rfc3339;
use crate::engine::Engine;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow {
    group_id: usize,
    reference: bool,
    marked: bool,
    path: String,
    size: u64,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    engine: &'a Engine,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let marks = self.engine.marks();

        for view in &self.engine.projection() {
            for file in &view.members {
                csv_writer.serialize(CsvRow {
                    group_id: view.group.id().get(),
                    reference: view.group.is_reference(file.key()),
                    marked: marks.is_marked(file.key()),
                    path: file.display_text().into_owned(),
                    size: file.size(),
                    modified: rfc3339(file).unwrap_or_default(),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
