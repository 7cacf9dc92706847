//! HTTP endpoint generation.
//!
//! An `@HTTP` cell becomes, in order: an optional request model, an
//! optional response model, the routed `<fn>_endpoint` handler, and the
//! user's own code.

use std::fmt;

use crate::codegen::ir::{FunctionDef, ModelDef, Param, Stmt, pascal_case, py_str};
use crate::compile::diagnostics::Diagnostics;
use crate::compile::fields::{FieldSpec, normalize_fields};
use crate::compile::introspect::{FunctionSignature, introspect};
use crate::compile::metadata::Metadata;
use crate::error::Error;

/// Supported HTTP methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpVerb {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Router method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method().to_uppercase())
    }
}

/// A classified `@HTTP` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEndpoint {
    pub verb: HttpVerb,
    pub path: String,
    pub body: Vec<FieldSpec>,
    pub resp: Vec<FieldSpec>,
    pub query: Vec<FieldSpec>,
    pub headers: Vec<FieldSpec>,
    pub source: String,
}

impl HttpEndpoint {
    /// Build from parsed metadata, normalizing every field list.
    pub fn from_metadata(
        verb: HttpVerb,
        path: impl Into<String>,
        meta: &Metadata,
        source: impl Into<String>,
        diags: &mut Diagnostics,
    ) -> Self {
        let mut fields = |key: &str| {
            meta.get(key)
                .map(|value| normalize_fields(value, diags))
                .unwrap_or_default()
        };
        Self {
            verb,
            path: path.into(),
            body: fields("body"),
            resp: fields("resp"),
            query: fields("query"),
            headers: fields("headers"),
            source: source.into(),
        }
    }

    /// Path parameters (`/{name}` segments), always typed `str`.
    pub fn path_params(&self) -> Vec<(String, String)> {
        extract_path_params(&self.path)
            .into_iter()
            .map(|name| (name, "str".to_string()))
            .collect()
    }

    /// Generate the endpoint. Returns `None` when the body defines no
    /// function to route to.
    pub fn generate(&self, diags: &mut Diagnostics) -> Option<Vec<Stmt>> {
        let Some(sig) = introspect(&self.source) else {
            diags.skipped(&Error::InvalidCell(format!(
                "{} {}: no function definition found",
                self.verb, self.path
            )));
            return None;
        };
        self.check_arguments(&sig, diags);

        let prefix = pascal_case(&sig.name);
        let request_model = format!("{prefix}RequestBody");
        let response_model = format!("{prefix}ResponseModel");

        let mut items = Vec::new();
        if !self.body.is_empty() {
            items.push(Stmt::Model(ModelDef::new(&request_model, self.body.clone())));
        }
        if !self.resp.is_empty() {
            items.push(Stmt::Model(ModelDef::new(&response_model, self.resp.clone())));
        }

        let mut route = format!("router.{}({}", self.verb.method(), py_str(&self.path));
        if !self.resp.is_empty() {
            route.push_str(&format!(", response_model={response_model}"));
        }
        route.push(')');

        let handler = FunctionDef::new(format!("{}_endpoint", sig.name))
            .asynchronous()
            .decorator(route)
            .params(self.handler_params(&request_model))
            .body(self.handler_body(&sig));

        items.push(Stmt::Function(handler));
        items.push(Stmt::Verbatim(self.source.clone()));
        Some(items)
    }

    fn handler_params(&self, request_model: &str) -> Vec<Param> {
        let mut params: Vec<Param> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for (name, ty) in self.path_params() {
            seen.push(name.clone());
            params.push(Param::typed(name, ty));
        }
        if !self.body.is_empty() {
            params.push(Param::typed("body", request_model));
        }
        for field in &self.query {
            if !seen.contains(&field.name) {
                seen.push(field.name.clone());
                params.push(Param::from_field(field));
            }
        }
        for field in &self.headers {
            if !seen.contains(&field.name) {
                seen.push(field.name.clone());
                params.push(Param::header(field));
            }
        }
        params
    }

    fn handler_body(&self, sig: &FunctionSignature) -> Vec<Stmt> {
        let call = format!(
            "return {}{}({})",
            if sig.is_async { "await " } else { "" },
            sig.name,
            self.call_arguments().join(", ")
        );

        vec![
            Stmt::block("try", vec![Stmt::Line(call)]),
            Stmt::block("except HTTPException", vec![Stmt::line("raise")]),
            Stmt::block(
                "except Exception as e",
                vec![
                    Stmt::block(
                        "if hasattr(e, 'status_code') and hasattr(e, 'message')",
                        vec![Stmt::line(
                            "raise HTTPException(status_code=e.status_code, detail=f'{e.message}')",
                        )],
                    ),
                    Stmt::block(
                        "else",
                        vec![Stmt::line(
                            "raise HTTPException(status_code=500, detail=f'Internal Server Error: {str(e)}')",
                        )],
                    ),
                ],
            ),
        ]
    }

    /// Keyword arguments for the user call: body fields read from the
    /// model, then query, path and header values by name.
    fn call_arguments(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        let path_params = self.path_params();

        for field in &self.body {
            seen.push(&field.name);
            args.push(format!("{0}=body.{0}", field.name));
        }
        let by_name = self
            .query
            .iter()
            .map(|f| f.name.as_str())
            .chain(path_params.iter().map(|(name, _)| name.as_str()))
            .chain(self.headers.iter().map(|f| f.name.as_str()));
        for name in by_name {
            if !seen.contains(&name) {
                seen.push(name);
                args.push(format!("{name}={name}"));
            }
        }
        args
    }

    /// Warn about declared names the user function does not accept.
    fn check_arguments(&self, sig: &FunctionSignature, diags: &mut Diagnostics) {
        let path_params = self.path_params();
        let mut missing: Vec<&str> = Vec::new();
        let expected = self
            .body
            .iter()
            .chain(&self.query)
            .chain(&self.headers)
            .map(|f| f.name.as_str())
            .chain(path_params.iter().map(|(name, _)| name.as_str()));

        for name in expected {
            if !sig.has_param(name) && !missing.contains(&name) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            diags.warn(format!(
                "missing expected arguments in function {}: {}",
                sig.name,
                missing.join(", ")
            ));
        }
    }
}

/// Names of `/{name}` segments, in order of appearance.
pub fn extract_path_params(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;

    while let Some(start) = rest.find("/{") {
        let after = &rest[start + 2..];
        let len = after
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len > 0 && after[len..].starts_with('}') {
            names.push(after[..len].to_string());
            rest = &after[len + 1..];
        } else {
            rest = after;
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ir::render;

    fn endpoint(path: &str, query: Vec<FieldSpec>, source: &str) -> HttpEndpoint {
        HttpEndpoint {
            verb: HttpVerb::Get,
            path: path.to_string(),
            body: Vec::new(),
            resp: Vec::new(),
            query,
            headers: Vec::new(),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_path_param_extraction() {
        let ep = endpoint("/users/{id}", vec![FieldSpec::required("name", "str")], "");
        assert_eq!(ep.path_params(), vec![("id".to_string(), "str".to_string())]);
    }

    #[test]
    fn test_path_params_need_closing_brace() {
        assert_eq!(extract_path_params("/a/{x}/b/{y_2}.json/{bad-name}"), vec!["x", "y_2"]);
        assert!(extract_path_params("/plain").is_empty());
    }

    #[test]
    fn test_handler_signature_includes_path_and_query() {
        let ep = endpoint(
            "/users/{id}",
            vec![FieldSpec::required("name", "str")],
            "def get_user(id, name):\n    return {'id': id}",
        );
        let mut diags = Diagnostics::for_cell(0);
        let text = render(&ep.generate(&mut diags).unwrap());

        assert!(text.contains("@router.get('/users/{id}')"));
        assert!(text.contains("async def get_user_endpoint(id: str, name: str):"));
        assert!(text.contains("        return get_user(name=name, id=id)"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_async_body_and_models() {
        let ep = HttpEndpoint {
            verb: HttpVerb::Post,
            path: "/users".into(),
            body: vec![
                FieldSpec::required("name", "str"),
                FieldSpec {
                    name: "age".into(),
                    ty: "int".into(),
                    optional: true,
                },
            ],
            resp: vec![FieldSpec::required("id", "int")],
            query: Vec::new(),
            headers: vec![FieldSpec::required("x_token", "str")],
            source: "async def create_user(name, age, x_token):\n    return {'id': 1}".into(),
        };
        let mut diags = Diagnostics::for_cell(0);
        let text = render(&ep.generate(&mut diags).unwrap());

        assert!(text.starts_with("class CreateUserRequestBody(BaseModel):\n    name: str\n    age: Optional[int] = None"));
        assert!(text.contains("class CreateUserResponseModel(BaseModel):\n    id: int"));
        assert!(text.contains("@router.post('/users', response_model=CreateUserResponseModel)"));
        assert!(text.contains(
            "async def create_user_endpoint(body: CreateUserRequestBody, x_token: str = Header(...)):"
        ));
        assert!(text.contains("return await create_user(name=body.name, age=body.age, x_token=x_token)"));
        assert!(text.ends_with("async def create_user(name, age, x_token):\n    return {'id': 1}"));
    }

    #[test]
    fn test_error_translation_block() {
        let ep = endpoint("/ping", Vec::new(), "def ping():\n    return 'pong'");
        let mut diags = Diagnostics::for_cell(0);
        let text = render(&ep.generate(&mut diags).unwrap());
        assert!(text.contains("    except HTTPException:\n        raise\n"));
        assert!(text.contains("raise HTTPException(status_code=e.status_code, detail=f'{e.message}')"));
        assert!(text.contains("raise HTTPException(status_code=500, detail=f'Internal Server Error: {str(e)}')"));
    }

    #[test]
    fn test_missing_arguments_warn() {
        let ep = endpoint(
            "/users/{id}",
            vec![FieldSpec::required("name", "str")],
            "def get_user(id):\n    return None",
        );
        let mut diags = Diagnostics::for_cell(2);
        assert!(ep.generate(&mut diags).is_some());
        let items = diags.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message, "missing expected arguments in function get_user: name");
    }

    #[test]
    fn test_no_function_is_error() {
        let ep = endpoint("/x", Vec::new(), "x = 1");
        let mut diags = Diagnostics::for_cell(0);
        assert!(ep.generate(&mut diags).is_none());
        assert!(diags.has_errors());
    }

    #[test]
    fn test_from_metadata_normalizes() {
        let lines: Vec<String> = vec!["query: [limit: int?, offset]".into(), "body: name:str".into()];
        let meta = Metadata::parse(&lines, 1).unwrap();
        let mut diags = Diagnostics::for_cell(0);
        let ep = HttpEndpoint::from_metadata(HttpVerb::Post, "/items", &meta, "def f(): pass", &mut diags);
        assert_eq!(ep.query.len(), 2);
        assert!(ep.query[0].optional);
        assert_eq!(ep.query[1].ty, "Any");
        assert_eq!(ep.body, vec![FieldSpec::required("name", "str")]);
        assert_eq!(diags.len(), 1);
    }
}
