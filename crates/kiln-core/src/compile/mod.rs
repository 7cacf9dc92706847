//! Cell compilation pipeline.
//!
//! ```text
//! CellRecord
//!     │
//!     ├── split_source ──► declaration lines + body
//!     │
//!     ├── Directive::detect ──► @HTTP / @WS / @SCHEDULE / passthrough
//!     │
//!     ├── Metadata::parse ──► normalize_fields ──► CellSpec
//!     │
//!     └── generator ──► CompiledCell ──► assemble ──► CompiledUnit
//! ```

mod assembler;
mod cell;
pub(crate) mod context;
pub(crate) mod diagnostics;
pub(crate) mod fields;
pub(crate) mod introspect;
pub(crate) mod metadata;
mod splitter;

pub use assembler::{CompiledUnit, PREAMBLE, assemble, compile_notebook};
pub use cell::{CellKind, CellOutcome, CellRecord, CellSpec, CompiledCell, classify, compile_cell};
pub use context::CompileContext;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use fields::{FieldSpec, normalize_fields, split_top_level};
pub use introspect::{FunctionSignature, introspect};
pub use metadata::{MetaValue, Metadata};
pub use splitter::{Directive, SplitSource, split_source};
