//! Core compiler for kiln notebooks.
//!
//! Turns annotated notebook cells into one Python service module per
//! notebook:
//! - `@HTTP` cells become FastAPI routes with pydantic models
//! - `@WS` cells become WebSocket handlers routed through `manager`
//! - `@SCHEDULE` cells become scheduler jobs
//! - everything else passes through unchanged
//!
//! ```
//! use kiln_core::{compile_notebook, CellRecord, CompileContext};
//!
//! let cells = vec![CellRecord::code(
//!     "# @HTTP GET /health\ndef health():\n    return {'ok': True}",
//! )];
//! let unit = compile_notebook(&cells, &mut CompileContext::new());
//! assert!(unit.source.contains("@router.get('/health')"));
//! ```

pub mod codegen;
pub mod compile;
pub mod error;

pub use codegen::{MANAGER_MODULE, MANAGER_MODULE_FILE};
pub use compile::{
    CellKind, CellRecord, CompileContext, CompiledUnit, Diagnostic, PREAMBLE, Severity,
    compile_notebook,
};
pub use error::{Error, Result};
