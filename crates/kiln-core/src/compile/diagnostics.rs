//! Per-cell diagnostics collected during compilation.
//!
//! Nothing reported here aborts a notebook. Errors mean the cell was
//! skipped or replaced by a fallback comment; warnings mean generation
//! went ahead with a best-effort interpretation.

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message tied to one cell of a notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,

    /// Zero-based index of the cell in the notebook
    pub cell: usize,

    /// Human-readable message
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell {}: {}: {}", self.cell, self.severity, self.message)
    }
}

/// Collector handed to the generators while one cell compiles.
#[derive(Debug, Default)]
pub struct Diagnostics {
    cell: usize,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a collector for the given cell index.
    pub fn for_cell(cell: usize) -> Self {
        Self {
            cell,
            items: Vec::new(),
        }
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(cell = self.cell, "{}", message);
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            cell: self.cell,
            message,
        });
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(cell = self.cell, "{}", message);
        self.items.push(Diagnostic {
            severity: Severity::Error,
            cell: self.cell,
            message,
        });
    }

    /// Record an error that caused the cell to be skipped.
    pub fn skipped(&mut self, err: &Error) {
        self.error(format!("{err}, cell skipped"));
    }

    /// Whether any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the collector.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
