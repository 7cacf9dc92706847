//! Error types for notebook reading and project builds.

use std::path::PathBuf;

/// Result type for notebook operations.
pub type NotebookResult<T> = Result<T, NotebookError>;

/// Errors that can occur while reading notebooks or building a project.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    /// Failed to read a source file.
    #[error("Failed to read file {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    /// Failed to write a build output.
    #[error("Failed to write file {path}: {message}")]
    WriteError { path: PathBuf, message: String },

    /// Notebook is not valid JSON or does not match the nbformat layout.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsed JSON that is not a usable notebook.
    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),

    /// File watcher could not be set up.
    #[error("Watch error: {0}")]
    Watch(String),
}

impl NotebookError {
    pub(crate) fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ReadError {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::WriteError {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Render the error together with a recovery hint for terminal output.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::ReadError { .. } => "check that the path exists and is readable",
            Self::WriteError { .. } => "check that the build directory is writable",
            Self::Json(_) | Self::InvalidNotebook(_) => {
                "open and re-save the notebook in Jupyter to repair it"
            }
            Self::Io(_) => "check file permissions",
            Self::Watch(_) => "check that the source directory exists",
        };
        format!("{self}\n  hint: {hint}")
    }
}
