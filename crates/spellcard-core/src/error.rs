//! Error types for spellcard-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spellcard-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Workbook could not be opened or its first sheet read
    #[error("spreadsheet error in '{path}': {source}")]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// Input formats no backend can read
    #[error("unsupported input format '{extension}' for '{path}': use CSV, XLSX, XLS or ODS")]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A required column is missing from the input header
    #[error("missing required column '{column}' in '{path}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    /// A cell failed type or enum validation
    #[error("invalid {column} on row {row} of '{path}': {message}")]
    InvalidField {
        path: PathBuf,
        row: usize,
        column: &'static str,
        message: String,
    },

    /// The input had a header but no spell rows
    #[error("no spell rows found in '{0}'")]
    EmptyInput(PathBuf),

    /// Unrecognized class token in a filter
    #[error("unknown class '{0}' (supported: Artificer, Bard, Cleric, Druid, Paladin, Ranger, Sorcerer, Warlock, Wizard)")]
    UnknownClass(String),

    /// Level token that is not an integer in 0..=9
    #[error("invalid level '{0}' (levels must be 0-9, inclusive)")]
    InvalidLevel(String),

    /// A table fragment exists but could not be read
    #[error("failed to read table fragment '{path}': {source}")]
    TableRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A table fragment exists but is not a simple row/cell table
    #[error("malformed table fragment '{path}': {message}")]
    TableParse { path: PathBuf, message: String },

    /// Failed to write a card
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unknown output format name
    #[error("unknown output format '{0}' (supported: fodt, json)")]
    UnknownFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broad classification used to decide between aborting and skipping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source file or configuration is unusable; aborts the run
    Input,
    /// Filter tokens are invalid; aborts the run
    Validation,
    /// A table fragment is broken; skips the record
    Resource,
    /// Rendering or writing a card failed; skips the record
    Render,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileRead { .. }
            | Error::Csv { .. }
            | Error::Spreadsheet { .. }
            | Error::UnsupportedFormat { .. }
            | Error::MissingColumn { .. }
            | Error::InvalidField { .. }
            | Error::EmptyInput(_)
            | Error::Json(_) => ErrorKind::Input,
            Error::UnknownClass(_) | Error::InvalidLevel(_) | Error::UnknownFormat(_) => {
                ErrorKind::Validation
            }
            Error::TableRead { .. } | Error::TableParse { .. } => ErrorKind::Resource,
            Error::Write { .. } | Error::Io(_) => ErrorKind::Render,
        }
    }

    /// Whether the batch may continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Resource | ErrorKind::Render)
    }
}
