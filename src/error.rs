use itertools::Itertools;
use thiserror::Error;

/// Fatal problems with an uploaded file. Any of these aborts the import before a
/// single row is sanitized, and the message is shown to the user verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported file type: {0}. Supported formats are .xlsx, .xls, .csv and .json")]
    UnsupportedFileType(String),

    #[error("File exceeds the maximum allowed size of {}MB", .limit_bytes / (1024 * 1024))]
    FileTooLarge { limit_bytes: usize },

    #[error("No sheets found in workbook")]
    NoSheets,

    #[error("File is empty")]
    EmptyFile,

    #[error("Invalid JSON format: expected a non-empty array of objects")]
    InvalidJson,

    #[error("{0}")]
    Decode(String),
}

impl From<csv::Error> for FormatError {
    fn from(err: csv::Error) -> Self {
        FormatError::Decode(err.to_string())
    }
}

impl From<calamine::Error> for FormatError {
    fn from(err: calamine::Error) -> Self {
        FormatError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(err: serde_json::Error) -> Self {
        FormatError::Decode(err.to_string())
    }
}

/// A required schema column has no non-skipped mapping pointing at it.
/// Recoverable: the caller re-maps and validates again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Required columns are not mapped: {}", .missing_columns.iter().join(", "))]
pub struct MatchValidationError {
    pub missing_columns: Vec<String>,
}

/// A manual mapping override that refers to something that does not exist.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OverrideError {
    #[error("No file column at position {0}")]
    UnknownFileColumn(usize),

    #[error("No file column named '{0}'")]
    UnknownFileColumnName(String),

    #[error("Schema has no column with id '{0}'")]
    UnknownSchemaColumn(String),
}
