//! Error types for the IFC workbench.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Outcomes of adding a file to the project registry that abort the add.
///
/// Re-adding an already open file is not an error, see
/// [`AddOutcome::AlreadyOpen`](crate::model::AddOutcome::AlreadyOpen).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The path does not exist.
    #[error("file '{path}' not found")]
    FileNotFound { path: PathBuf },

    /// The parser rejected the file content.
    #[error("'{path}' is not a valid IFC file: {source}")]
    InvalidFileFormat {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The file belongs to another project than the files already open.
    #[error("'{path}' belongs to project {found}, but the open files belong to {expected}")]
    ProjectMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Another open file has the same file name. Results and element
    /// sources are keyed by file name, so it must be unique.
    #[error("'{path}' has the same name as the open file '{filename}'")]
    FilenameTaken { path: PathBuf, filename: String },

    /// The registry is lent to a running background load.
    #[error("'{path}' skipped: a load is already running")]
    LoadRunning { path: PathBuf },
}

/// Errors that can occur when loading rule (IDS) documents.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule document does not exist.
    #[error("rule file '{path}' not found")]
    FileNotFound { path: PathBuf },

    /// The rule document could not be read or is malformed.
    #[error("'{path}' is not a valid IDS file: {message}")]
    InvalidRuleFile { path: PathBuf, message: String },
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },

    /// Failed to write the zipped report bundle.
    #[error("report bundle write failed: {source}")]
    Zip {
        #[from]
        source: zip::result::ZipError,
    },

    /// No validation result exists for the requested validator and file.
    #[error("no validation result for validator '{validator}' and file '{filename}'")]
    UnknownReporter { validator: String, filename: String },
}
