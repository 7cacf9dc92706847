//! Cell records, classification and per-cell compilation.

use serde::{Deserialize, Serialize};

use crate::codegen::{HttpEndpoint, HttpVerb, ScheduledJob, Stmt, WebSocketEndpoint, render};
use crate::compile::context::CompileContext;
use crate::compile::diagnostics::Diagnostics;
use crate::compile::metadata::Metadata;
use crate::compile::splitter::{Directive, split_source};

/// Kind of a notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Code,
    Raw,
    Markdown,
}

/// One cell as supplied by the notebook reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub kind: CellKind,
    pub source: String,
}

impl CellRecord {
    pub fn code(source: impl Into<String>) -> Self {
        Self {
            kind: CellKind::Code,
            source: source.into(),
        }
    }
}

/// A cell after classification, carrying only what its generator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellSpec {
    /// No directive: the source is emitted unchanged
    Passthrough(String),
    Http(HttpEndpoint),
    WebSocket(WebSocketEndpoint),
    Scheduled(ScheduledJob),
}

/// Generated output for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledCell {
    Code(String),
    Http(Vec<Stmt>),
    WebSocket(Vec<Stmt>),
    Scheduled(Vec<Stmt>),
}

impl CompiledCell {
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Render to Python source.
    pub fn render(&self) -> String {
        match self {
            Self::Code(source) => source.clone(),
            Self::Http(items) | Self::WebSocket(items) | Self::Scheduled(items) => render(items),
        }
    }
}

/// What happened to one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    Compiled(CompiledCell),
    /// Non-code or empty cell
    Ignored,
    /// Annotated cell that produced no output; see diagnostics
    Skipped,
}

/// Classify a cell source.
///
/// Returns `None` for empty cells and for annotated cells that cannot be
/// compiled; the reason for the latter is recorded in `diags`.
pub fn classify(source: &str, diags: &mut Diagnostics) -> Option<CellSpec> {
    let split = split_source(source)?;

    let Some((directive, rest)) = split.declaration.first().and_then(|l| Directive::detect(l)) else {
        return Some(CellSpec::Passthrough(source.to_string()));
    };
    tracing::debug!(directive = directive.token(), "classified cell");

    let mut meta_lines: Vec<String> = split.declaration[1..].to_vec();
    let mut first_line = 2;
    let body = split.body_text();

    match directive {
        Directive::Http => {
            let head = if !rest.is_empty() {
                rest.to_string()
            } else if !meta_lines.is_empty() {
                first_line += 1;
                meta_lines.remove(0)
            } else {
                String::new()
            };

            let (verb_token, path) = match head.split_once(char::is_whitespace) {
                Some((verb, path)) => (verb, path.trim()),
                None => (head.as_str(), ""),
            };
            let Some(verb) = HttpVerb::parse(verb_token) else {
                diags.warn("@HTTP cell has no method (GET, POST, PUT, DELETE, PATCH), cell skipped");
                return None;
            };
            if path.is_empty() {
                diags.warn(format!("@HTTP {verb} cell has no path, cell skipped"));
                return None;
            }

            let meta = parse_metadata(&meta_lines, first_line, diags)?;
            if body.is_empty() {
                diags.warn(format!("{verb} {path}: cell has no body, cell skipped"));
                return None;
            }
            Some(CellSpec::Http(HttpEndpoint::from_metadata(verb, path, &meta, body, diags)))
        }
        Directive::WebSocket => {
            if rest.is_empty() {
                diags.warn("@WS cell has no path, cell skipped");
                return None;
            }
            let meta = parse_metadata(&meta_lines, first_line, diags)?;
            if body.is_empty() {
                diags.warn(format!("websocket {rest}: cell has no body, cell skipped"));
                return None;
            }
            WebSocketEndpoint::from_metadata(rest, &meta, body, diags).map(CellSpec::WebSocket)
        }
        Directive::Schedule => {
            if !rest.is_empty() {
                meta_lines.insert(0, rest.to_string());
                first_line = 1;
            }
            let meta = parse_metadata(&meta_lines, first_line, diags)?;
            if body.is_empty() {
                diags.warn("scheduled cell has no body, cell skipped");
                return None;
            }
            ScheduledJob::from_metadata(&meta, body, diags).map(CellSpec::Scheduled)
        }
    }
}

fn parse_metadata(lines: &[String], first_line: usize, diags: &mut Diagnostics) -> Option<Metadata> {
    match Metadata::parse(lines, first_line) {
        Ok(meta) => Some(meta),
        Err(e) => {
            diags.skipped(&e);
            None
        }
    }
}

/// Compile one cell.
pub fn compile_cell(
    record: &CellRecord,
    ctx: &mut CompileContext,
    diags: &mut Diagnostics,
) -> CellOutcome {
    if record.kind != CellKind::Code {
        return CellOutcome::Ignored;
    }
    if record.source.trim().is_empty() {
        return CellOutcome::Ignored;
    }

    let compiled = match classify(&record.source, diags) {
        None => None,
        Some(CellSpec::Passthrough(source)) => Some(CompiledCell::Code(source)),
        Some(CellSpec::Http(endpoint)) => endpoint.generate(diags).map(CompiledCell::Http),
        Some(CellSpec::WebSocket(endpoint)) => endpoint.generate(diags).map(CompiledCell::WebSocket),
        Some(CellSpec::Scheduled(job)) => Some(CompiledCell::Scheduled(job.generate(ctx, diags))),
    };

    match compiled {
        Some(cell) => CellOutcome::Compiled(cell),
        None => CellOutcome::Skipped,
    }
}
