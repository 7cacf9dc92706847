//! Structured representation of generated Python.
//!
//! Generators build [`Stmt`] trees and never concatenate code text by
//! hand. [`render`] is the single pass that turns a tree into source,
//! so indentation of nested blocks and wrapped user code is decided in
//! one place.

use crate::codegen::emitter::Emitter;
use crate::compile::fields::FieldSpec;

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
    pub default: Option<String>,
}

impl Param {
    /// Parameter without annotation or default.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
        }
    }

    /// Annotated parameter without a default.
    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Parameter for a declared field; optional fields default to `None`.
    pub fn from_field(field: &FieldSpec) -> Self {
        let param = Self::typed(&field.name, field.annotation());
        if field.optional {
            param.with_default("None")
        } else {
            param
        }
    }

    /// Header parameter bound through FastAPI's `Header()`.
    pub fn header(field: &FieldSpec) -> Self {
        let default = if field.optional { "Header(None)" } else { "Header(...)" };
        Self::typed(&field.name, field.annotation()).with_default(default)
    }

    fn render(&self) -> String {
        let mut out = self.name.clone();
        if let Some(ty) = &self.ty {
            out.push_str(": ");
            out.push_str(ty);
        }
        if let Some(default) = &self.default {
            out.push_str(if self.ty.is_some() { " = " } else { "=" });
            out.push_str(default);
        }
        out
    }
}

/// A `def` / `async def` with its decorators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decorators: Vec::new(),
            is_async: false,
            name: name.into(),
            params: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn decorator(mut self, decorator: impl Into<String>) -> Self {
        self.decorators.push(decorator.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }

    /// The `def` line. Required parameters come before defaulted ones,
    /// each group in declaration order.
    fn header(&self) -> String {
        let (required, defaulted): (Vec<&Param>, Vec<&Param>) =
            self.params.iter().partition(|p| p.default.is_none());
        let params: Vec<String> = required
            .into_iter()
            .chain(defaulted)
            .map(Param::render)
            .collect();

        format!(
            "{}def {}({}):",
            if self.is_async { "async " } else { "" },
            self.name,
            params.join(", ")
        )
    }
}

/// A pydantic model class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDef {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// One statement or top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// A single line at the current indentation
    Line(String),

    /// An empty line
    Blank,

    /// `header:` followed by an indented body
    Block { header: String, body: Vec<Stmt> },

    /// User code, re-indented to the current level
    Verbatim(String),

    Function(FunctionDef),

    Model(ModelDef),
}

impl Stmt {
    pub fn line(text: impl Into<String>) -> Self {
        Self::Line(text.into())
    }

    pub fn block(header: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self::Block {
            header: header.into(),
            body,
        }
    }
}

/// Render top-level items, two blank lines apart.
pub fn render(items: &[Stmt]) -> String {
    let mut out = Emitter::new();
    for item in items {
        out.ensure_blank_lines(2);
        render_stmt(&mut out, item, 0);
    }
    out.output()
}

fn render_stmt(out: &mut Emitter, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Line(text) => out.line(level, text),
        Stmt::Blank => out.blank(),
        Stmt::Block { header, body } => {
            out.line(level, &format!("{header}:"));
            render_body(out, body, level + 1);
        }
        Stmt::Verbatim(code) => out.verbatim(level, code),
        Stmt::Function(func) => {
            for decorator in &func.decorators {
                out.line(level, &format!("@{decorator}"));
            }
            out.line(level, &func.header());
            render_body(out, &func.body, level + 1);
        }
        Stmt::Model(model) => {
            out.line(level, &format!("class {}(BaseModel):", model.name));
            if model.fields.is_empty() {
                out.line(level + 1, "pass");
            }
            for field in &model.fields {
                let line = if field.optional {
                    format!("{}: {} = None", field.name, field.annotation())
                } else {
                    format!("{}: {}", field.name, field.ty)
                };
                out.line(level + 1, &line);
            }
        }
    }
}

fn render_body(out: &mut Emitter, body: &[Stmt], level: usize) {
    if body.is_empty() {
        out.line(level, "pass");
        return;
    }
    for stmt in body {
        render_stmt(out, stmt, level);
    }
}

/// Quote a string as a single-quoted Python literal.
pub fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `snake_case` to `PascalCase`.
pub fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect()
}
