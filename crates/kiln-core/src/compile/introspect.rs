//! Function signature extraction from Python cell bodies.
//!
//! Only what the generators need: the name, the ordered parameter names
//! and whether the function is `async`. This is a line scanner, not a
//! Python parser. Comments and triple-quoted strings are skipped so a
//! `def` inside a docstring is never picked up.

use crate::compile::fields::split_top_level;

/// Signature of the function a cell exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,

    /// Parameter names in declaration order, excluding `*args`,
    /// `**kwargs` and the bare `*` / `/` markers
    pub params: Vec<String>,

    /// `async def`
    pub is_async: bool,

    /// Zero-based line of the `def` within the source
    pub line: usize,

    /// Indentation (in characters) of the `def` line
    pub indent: usize,
}

impl FunctionSignature {
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p == name)
    }
}

/// Find the outermost function definition in `source`.
///
/// When several definitions exist, the least indented one wins, and the
/// earliest among those. Returns `None` when the source defines no
/// function or the parameter list is unterminated.
pub fn introspect(source: &str) -> Option<FunctionSignature> {
    let lines: Vec<&str> = source.lines().collect();

    let mut best: Option<(usize, usize)> = None;
    for (idx, indent) in def_lines(&lines) {
        match best {
            Some((_, best_indent)) if best_indent <= indent => {}
            _ => best = Some((idx, indent)),
        }
    }

    let (line, indent) = best?;
    parse_def(&lines, line, indent)
}

/// Yield `(line, indent)` for every line that starts a `def`.
fn def_lines(lines: &[&str]) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut open_triple: Option<&'static str> = None;

    for (idx, line) in lines.iter().enumerate() {
        if let Some(delim) = open_triple {
            if line.contains(delim) {
                open_triple = None;
            }
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            continue;
        }
        if def_keyword(trimmed).is_some() {
            found.push((idx, line.len() - trimmed.len()));
            continue;
        }

        for delim in ["\"\"\"", "'''"] {
            if line.matches(delim).count() % 2 == 1 {
                open_triple = Some(delim);
                break;
            }
        }
    }

    found
}

/// If the line starts a definition, return `(is_async, rest after "def")`.
fn def_keyword(trimmed: &str) -> Option<(bool, &str)> {
    if let Some(rest) = trimmed.strip_prefix("def ") {
        return Some((false, rest));
    }
    let rest = trimmed.strip_prefix("async")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start().strip_prefix("def ")?;
    Some((true, rest))
}

fn parse_def(lines: &[&str], line: usize, indent: usize) -> Option<FunctionSignature> {
    let (is_async, rest) = def_keyword(lines[line].trim_start())?;
    let rest = rest.trim_start();

    let name_end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..name_end];
    if name.is_empty() {
        return None;
    }

    let after_name = rest[name_end..].trim_start();
    let after_paren = after_name.strip_prefix('(')?;
    let param_text = collect_params(after_paren, &lines[line + 1..])?;

    let params = split_top_level(&param_text)
        .into_iter()
        .filter_map(|param| param_name(&param))
        .collect();

    Some(FunctionSignature {
        name: name.to_string(),
        params,
        is_async,
        line,
        indent,
    })
}

/// Gather text up to the `)` closing the parameter list, across lines.
fn collect_params(first: &str, following: &[&str]) -> Option<String> {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let segments = std::iter::once(first).chain(following.iter().copied());
    for segment in segments {
        for c in segment.chars() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    out.push(c);
                }
                None => match c {
                    '#' => break,
                    '\'' | '"' => {
                        quote = Some(c);
                        out.push(c);
                    }
                    '(' | '[' | '{' => {
                        depth += 1;
                        out.push(c);
                    }
                    ')' if depth == 0 => return Some(out),
                    ')' | ']' | '}' => {
                        depth = depth.saturating_sub(1);
                        out.push(c);
                    }
                    _ => out.push(c),
                },
            }
        }
        out.push(' ');
    }

    None
}

fn param_name(param: &str) -> Option<String> {
    let param = param.trim();
    if param.is_empty() || param.starts_with('*') || param == "/" {
        return None;
    }
    let end = param.find([':', '=']).unwrap_or(param.len());
    let name = param[..end].trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sync_function() {
        let sig = introspect("def add(a, b):\n    return a + b\n").unwrap();
        assert_eq!(sig.name, "add");
        assert_eq!(sig.params, vec!["a", "b"]);
        assert!(!sig.is_async);
        assert_eq!(sig.line, 0);
    }

    #[test]
    fn test_async_with_annotations_and_defaults() {
        let src = "async def fetch(user_id: int, limit: int = 10, tags: dict[str, int] = {}):\n    pass";
        let sig = introspect(src).unwrap();
        assert!(sig.is_async);
        assert_eq!(sig.params, vec!["user_id", "limit", "tags"]);
    }

    #[test]
    fn test_multiline_params() {
        let src = "def create(\n    name: str,  # the name\n    age: int = 0,\n) -> dict:\n    return {}";
        let sig = introspect(src).unwrap();
        assert_eq!(sig.params, vec!["name", "age"]);
    }

    #[test]
    fn test_star_params_excluded() {
        let sig = introspect("def f(a, /, b, *, c, *args, **kwargs):\n    pass").unwrap();
        assert_eq!(sig.params, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_string_default_with_paren() {
        let sig = introspect("def f(sep=')', end=','):\n    pass").unwrap();
        assert_eq!(sig.params, vec!["sep", "end"]);
    }

    #[test]
    fn test_no_function() {
        assert!(introspect("print('hello')\nx = 1\n").is_none());
    }

    #[test]
    fn test_def_in_docstring_and_comment_ignored() {
        let src = "\"\"\"\ndef fake(x):\n\"\"\"\n# def other(y):\nasync def real(z):\n    pass";
        let sig = introspect(src).unwrap();
        assert_eq!(sig.name, "real");
        assert_eq!(sig.line, 4);
    }

    #[test]
    fn test_outermost_definition_wins() {
        let src = "    def inner(a):\n        pass\ndef outer(b):\n    pass";
        let sig = introspect(src).unwrap();
        assert_eq!(sig.name, "outer");
        assert_eq!(sig.indent, 0);
    }

    #[test]
    fn test_nested_helper_after_main() {
        let src = "def main(x):\n    def helper(y):\n        return y\n    return helper(x)";
        assert_eq!(introspect(src).unwrap().name, "main");
    }

    #[test]
    fn test_unterminated_params() {
        assert!(introspect("def broken(a, b:\n    pass").is_none());
    }

    #[test]
    fn test_decorated_function() {
        let src = "@cache\ndef get(key):\n    return key";
        let sig = introspect(src).unwrap();
        assert_eq!(sig.line, 1);
        assert!(sig.has_param("key"));
    }
}
