//! Error types for kiln-core.

use thiserror::Error;

/// Result type for kiln-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in kiln-core.
///
/// These are structural failures of a single cell. Non-fatal findings
/// (missing arguments, bad cron strings) are reported as
/// [`Diagnostic`](crate::compile::Diagnostic) values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The declaration block could not be parsed as key/value metadata.
    #[error("failed to parse metadata at line {line}: {message}")]
    Metadata { line: usize, message: String },

    /// The cell is structurally unusable (e.g. no function to bind).
    #[error("invalid cell: {0}")]
    InvalidCell(String),
}

impl Error {
    /// Create a metadata error for a 1-indexed declaration line.
    pub fn metadata(line: usize, message: impl Into<String>) -> Self {
        Self::Metadata {
            line,
            message: message.into(),
        }
    }
}
