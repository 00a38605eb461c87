//! Failure classes raised by the processing stages.
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a processing run.
///
/// Every variant is fatal: structural problems stop the run at the stage
/// where they are found. Numeric degeneracies (zero or missing start price)
/// are not errors and never surface here.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A required column is absent from the input header.
    #[error("Missing required column: '{column}'. Found columns: {found:?}")]
    Schema { column: String, found: Vec<String> },

    /// The input has a header but no data rows (or nothing at all).
    #[error("Input table is empty")]
    EmptyTable,

    /// A cell cannot be read as its column's type.
    #[error("Column '{column}', row {row}: cannot read '{value}' as {expected}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        expected: String,
    },

    /// The input source does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input exists but could not be parsed as a table.
    #[error("Failed to load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// An existing output directory holds entries this tool did not write.
    #[error("Refusing to replace {}: it contains '{entry}', which is not processed output", path.display())]
    OutputConflict { path: PathBuf, entry: String },

    /// The destination could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        ProcessError::Io {
            path: path.into(),
            source: source.into(),
        }
    }
}
