//! Output formatters for the current results view.
//!
//! This module exports what the engine's projection shows:
//! - Plain text for the terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use dupemark::actions::LocalFileOps;
//! use dupemark::engine::Engine;
//! use dupemark::output::JsonOutput;
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Arc::new(LocalFileOps::new()));
//! let output = JsonOutput::new(&engine);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
