//! Notebook-level assembly.
//!
//! Compiles every cell of one notebook and joins the results behind the
//! fixed preamble. Non-HTTP cells always come first so that routes are
//! registered after everything they depend on; order within each group
//! follows the notebook.

use serde::Serialize;

use crate::compile::cell::{CellOutcome, CellRecord, CompiledCell, compile_cell};
use crate::compile::context::CompileContext;
use crate::compile::diagnostics::{Diagnostic, Diagnostics};

/// Imports and router bootstrap at the top of every compiled unit.
pub const PREAMBLE: &str = "\
from fastapi import APIRouter, Header, HTTPException, WebSocket, WebSocketDisconnect
from pydantic import BaseModel, ValidationError
from scheduler import scheduler
from typing import Any, AsyncGenerator, Callable, Dict, List, Optional, Union
import asyncio
import json
import uuid

from websocket_manager import manager


router = APIRouter()
";

/// Result of compiling one notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledUnit {
    /// Generated Python module
    pub source: String,

    /// Number of cells that produced output
    pub compiled: usize,

    /// Number of annotated cells that produced no output
    pub skipped: usize,

    /// Everything reported while compiling, in cell order
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledUnit {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == crate::compile::diagnostics::Severity::Error)
    }
}

/// Join compiled cells behind the preamble.
///
/// HTTP cells are moved after all other cells with a stable sort, so the
/// relative order inside each group is preserved.
pub fn assemble(mut cells: Vec<CompiledCell>) -> String {
    cells.sort_by_key(CompiledCell::is_http);

    let mut out = String::from(PREAMBLE);
    for cell in &cells {
        let rendered = cell.render();
        let rendered = rendered.trim_end();
        if rendered.is_empty() {
            continue;
        }
        out.push_str("\n\n");
        out.push_str(rendered);
        out.push('\n');
    }
    out
}

/// Compile the cells of one notebook.
///
/// Per-cell failures never abort the notebook: they are counted as
/// skipped and described in the returned diagnostics.
pub fn compile_notebook(records: &[CellRecord], ctx: &mut CompileContext) -> CompiledUnit {
    let mut cells = Vec::new();
    let mut skipped = 0;
    let mut diagnostics = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let mut diags = Diagnostics::for_cell(index);
        match compile_cell(record, ctx, &mut diags) {
            CellOutcome::Compiled(cell) => cells.push(cell),
            CellOutcome::Skipped => skipped += 1,
            CellOutcome::Ignored => {}
        }
        diagnostics.extend(diags.into_vec());
    }

    let compiled = cells.len();
    tracing::info!(compiled, skipped, "compiled notebook");

    CompiledUnit {
        source: assemble(cells),
        compiled,
        skipped,
        diagnostics,
    }
}
