//! Typed field declarations (`name: type?`).
//!
//! Used for request bodies, query parameters, headers, response models
//! and WebSocket message schemas. A field is written as `name: type`,
//! with an optional `?` marking it optional or `!` marking it
//! explicitly required.

use crate::compile::diagnostics::Diagnostics;
use crate::compile::metadata::MetaValue;

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Python identifier
    pub name: String,

    /// Python type expression, without the `?`/`!` marker
    pub ty: String,

    /// Whether the field may be omitted
    pub optional: bool,
}

impl FieldSpec {
    /// Create a required field.
    pub fn required(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            optional: false,
        }
    }

    /// Parse a single `name: type[?|!]` declaration.
    ///
    /// A missing type becomes `Any` and records a warning. Returns `None`
    /// for an empty declaration.
    pub fn parse(raw: &str, diags: &mut Diagnostics) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let (name, ty) = match raw.split_once(':') {
            Some((name, ty)) => (name.trim(), ty.trim()),
            None => (raw, ""),
        };
        if name.is_empty() {
            diags.warn(format!("field declaration has no name: {raw}"));
            return None;
        }

        let (ty, optional) = if let Some(base) = ty.strip_suffix('?') {
            (base.trim_end(), true)
        } else if let Some(base) = ty.strip_suffix('!') {
            (base.trim_end(), false)
        } else {
            (ty, false)
        };

        let ty = if ty.is_empty() {
            diags.warn(format!("no type hint for field: {name}, using Any"));
            "Any"
        } else {
            ty
        };

        Some(Self {
            name: name.to_string(),
            ty: ty.to_string(),
            optional,
        })
    }

    /// Type as written in a model field or parameter annotation.
    pub fn annotation(&self) -> String {
        if self.optional {
            format!("Optional[{}]", self.ty)
        } else {
            self.ty.clone()
        }
    }
}

/// Split on commas that are not nested inside brackets, braces or
/// parentheses. Segments are trimmed; empty segments are kept.
///
/// ```
/// use kiln_core::compile::split_top_level;
///
/// let parts = split_top_level("a: list[int, str], b: dict[str, int]");
/// assert_eq!(parts, vec!["a: list[int, str]", "b: dict[str, int]"]);
/// ```
pub fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();

    for c in s.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '[' | '{' | '(' => {
                    depth += 1;
                    current.push(c);
                }
                ']' | '}' | ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(c);
                }
                ',' if depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(c),
            },
        }
    }
    parts.push(current.trim().to_string());
    parts
}

/// Normalize a metadata value into field declarations.
///
/// Accepts a comma-separated string, a list of strings or single-entry
/// maps, or a map of `name: type`. `Null` yields no fields.
pub fn normalize_fields(value: &MetaValue, diags: &mut Diagnostics) -> Vec<FieldSpec> {
    let mut fields = Vec::new();

    match value {
        MetaValue::Null => {}
        MetaValue::Str(s) => {
            for part in split_top_level(s) {
                fields.extend(FieldSpec::parse(&part, diags));
            }
        }
        MetaValue::List(items) => {
            for item in items {
                match item {
                    MetaValue::Map(entries) => {
                        for (name, ty) in entries {
                            fields.extend(field_from_entry(name, ty, diags));
                        }
                    }
                    MetaValue::List(_) => {
                        diags.warn("nested lists are not valid field declarations");
                    }
                    scalar => {
                        if let Some(text) = scalar.as_scalar_string() {
                            fields.extend(FieldSpec::parse(&text, diags));
                        }
                    }
                }
            }
        }
        MetaValue::Map(entries) => {
            for (name, ty) in entries {
                fields.extend(field_from_entry(name, ty, diags));
            }
        }
        scalar => {
            if let Some(text) = scalar.as_scalar_string() {
                fields.extend(FieldSpec::parse(&text, diags));
            }
        }
    }

    fields
}

fn field_from_entry(name: &str, ty: &MetaValue, diags: &mut Diagnostics) -> Option<FieldSpec> {
    match ty.as_scalar_string() {
        Some(ty) => FieldSpec::parse(&format!("{name}: {ty}"), diags),
        None if matches!(ty, MetaValue::Null) => FieldSpec::parse(name, diags),
        None => {
            diags.warn(format!("unsupported type for field: {name}, using Any"));
            Some(FieldSpec::required(name, "Any"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(raw: &str) -> (Option<FieldSpec>, Diagnostics) {
        let mut diags = Diagnostics::for_cell(0);
        let field = FieldSpec::parse(raw, &mut diags);
        (field, diags)
    }

    #[test]
    fn test_split_respects_brackets() {
        let parts = split_top_level("a: list[int, str], b: dict[str, int]");
        assert_eq!(parts, vec!["a: list[int, str]", "b: dict[str, int]"]);
    }

    #[test]
    fn test_split_nested_and_quoted() {
        let parts = split_top_level("x: Dict[str, List[int]], y: 'a,b', z: Tuple(int, int)");
        assert_eq!(
            parts,
            vec!["x: Dict[str, List[int]]", "y: 'a,b'", "z: Tuple(int, int)"]
        );
    }

    #[test]
    fn test_split_keeps_empty_segments() {
        assert_eq!(split_top_level("a,,b"), vec!["a", "", "b"]);
        assert_eq!(split_top_level(""), vec![""]);
    }

    #[test]
    fn test_optional_marker() {
        let (field, diags) = parse_one("age: int?");
        let field = field.unwrap();
        assert!(field.optional);
        assert_eq!(field.ty, "int");
        assert_eq!(field.annotation(), "Optional[int]");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_required_marker_is_stripped() {
        let (field, _) = parse_one("age: int!");
        assert_eq!(field.unwrap(), FieldSpec::required("age", "int"));
    }

    #[test]
    fn test_missing_type_defaults_to_any() {
        let (field, diags) = parse_one("payload");
        assert_eq!(field.unwrap().ty, "Any");
        assert_eq!(diags.len(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_generic_type_kept_whole() {
        let (field, _) = parse_one("tags: dict[str, list[int]]?");
        let field = field.unwrap();
        assert_eq!(field.ty, "dict[str, list[int]]");
        assert!(field.optional);
    }

    #[test]
    fn test_normalize_string() {
        let mut diags = Diagnostics::for_cell(0);
        let fields = normalize_fields(&MetaValue::Str("name:str, age:int?,".into()), &mut diags);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], FieldSpec::required("name", "str"));
        assert!(fields[1].optional);
    }

    #[test]
    fn test_normalize_list_and_map_agree() {
        let mut diags = Diagnostics::for_cell(0);
        let from_list = normalize_fields(
            &MetaValue::List(vec![
                MetaValue::Str("limit: int".into()),
                MetaValue::Map(vec![("offset".into(), MetaValue::Str("int?".into()))]),
            ]),
            &mut diags,
        );
        let from_map = normalize_fields(
            &MetaValue::Map(vec![
                ("limit".into(), MetaValue::Str("int".into())),
                ("offset".into(), MetaValue::Str("int?".into())),
            ]),
            &mut diags,
        );
        assert_eq!(from_list, from_map);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_normalize_null() {
        let mut diags = Diagnostics::for_cell(0);
        assert!(normalize_fields(&MetaValue::Null, &mut diags).is_empty());
    }
}
