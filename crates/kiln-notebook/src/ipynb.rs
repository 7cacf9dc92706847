//! Jupyter notebook (.ipynb) reading.
//!
//! Only the parts of nbformat 4 the compiler needs are modelled; unknown
//! fields (outputs, metadata, execution counts) are ignored.

use std::fs;
use std::path::Path;

use kiln_core::{CellKind, CellRecord};
use serde::Deserialize;

use crate::error::{NotebookError, NotebookResult};

/// A Jupyter notebook.
#[derive(Debug, Clone, Deserialize)]
pub struct JupyterNotebook {
    /// Format version
    #[serde(default)]
    pub nbformat: u32,

    /// Notebook cells
    pub cells: Vec<JupyterCell>,
}

/// One Jupyter cell.
#[derive(Debug, Clone, Deserialize)]
pub struct JupyterCell {
    /// `code`, `markdown` or `raw`
    pub cell_type: String,

    /// Cell source
    #[serde(default)]
    pub source: CellSource,
}

/// Cell source, stored either as one string or as a list of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Text(String),
    Lines(Vec<String>),
}

impl Default for CellSource {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl CellSource {
    /// Full source text. Lines already carry their own newlines.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.concat(),
        }
    }
}

impl JupyterCell {
    fn kind(&self) -> CellKind {
        match self.cell_type.as_str() {
            "code" => CellKind::Code,
            "raw" => CellKind::Raw,
            _ => CellKind::Markdown,
        }
    }

    fn to_record(&self) -> CellRecord {
        CellRecord {
            kind: self.kind(),
            source: self.source.text(),
        }
    }
}

impl JupyterNotebook {
    /// Parse notebook JSON.
    pub fn from_json(json: &str) -> NotebookResult<Self> {
        let notebook: Self = serde_json::from_str(json)?;
        if notebook.nbformat != 0 && notebook.nbformat < 4 {
            return Err(NotebookError::InvalidNotebook(format!(
                "nbformat {} is not supported",
                notebook.nbformat
            )));
        }
        Ok(notebook)
    }

    /// Cells in notebook order.
    pub fn records(&self) -> Vec<CellRecord> {
        self.cells.iter().map(JupyterCell::to_record).collect()
    }
}

/// Read the cells of a notebook file.
pub fn read_notebook(path: impl AsRef<Path>) -> NotebookResult<Vec<CellRecord>> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| NotebookError::read(path, e))?;
    let notebook = JupyterNotebook::from_json(&json)?;
    tracing::debug!(path = %path.display(), cells = notebook.cells.len(), "read notebook");
    Ok(notebook.records())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTEBOOK: &str = r##"{
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {"kernelspec": {"name": "python3"}},
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": ["# Title\n", "text"]},
            {"cell_type": "code", "metadata": {}, "execution_count": 1, "outputs": [],
             "source": ["# @HTTP GET /x\n", "def f():\n", "    return 1"]},
            {"cell_type": "raw", "metadata": {}, "source": "raw text"}
        ]
    }"##;

    #[test]
    fn test_records_keep_kind_and_source() {
        let records = JupyterNotebook::from_json(NOTEBOOK).unwrap().records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, CellKind::Markdown);
        assert_eq!(records[1].kind, CellKind::Code);
        assert_eq!(records[1].source, "# @HTTP GET /x\ndef f():\n    return 1");
        assert_eq!(records[2].kind, CellKind::Raw);
        assert_eq!(records[2].source, "raw text");
    }

    #[test]
    fn test_invalid_json() {
        let err = JupyterNotebook::from_json("{ not json").unwrap_err();
        assert!(matches!(err, NotebookError::Json(_)));
    }

    #[test]
    fn test_old_format_rejected() {
        let err = JupyterNotebook::from_json(r#"{"nbformat": 3, "cells": []}"#).unwrap_err();
        assert!(matches!(err, NotebookError::InvalidNotebook(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = read_notebook("/definitely/not/here.ipynb").unwrap_err();
        assert!(matches!(err, NotebookError::ReadError { .. }));
    }
}
