//! Metadata extraction from cell declaration blocks.
//!
//! Parses the `key: value` lines that follow a directive into a
//! [`Metadata`] mapping.
//!
//! # Format
//!
//! A restricted, YAML-compatible subset:
//!
//! ```text
//! body: name: str            <- rejected, quote it instead
//! body: "name: str, age: int?"
//! query: [limit: int, offset: int?]
//! headers:
//!   - x_token: str
//! type: stream
//! validate: true
//! ```
//!
//! Supported: block mappings, block sequences (including compact
//! `- key: value` items), flow sequences `[..]`, flow mappings `{..}`,
//! single/double quoted strings, `null`/bool/int/float scalars and `#`
//! comments. Anchors, tags, and multi-line scalars are not supported.
//! Plain scalars may not contain `": "`, as in YAML.

use crate::compile::fields::split_top_level;
use crate::error::{Error, Result};

/// A parsed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
    /// Mapping entries in declaration order.
    Map(Vec<(String, MetaValue)>),
}

impl MetaValue {
    /// Render a scalar back to text. Collections return `None`.
    pub fn as_scalar_string(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::List(_) | Self::Map(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Key/value metadata parsed from a declaration block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    /// Parse declaration lines.
    ///
    /// `first_line` is the 1-indexed position of `lines[0]` inside the
    /// declaration block, used for error messages.
    pub fn parse(lines: &[String], first_line: usize) -> Result<Self> {
        let mut parser = BlockParser::new(lines, first_line)?;
        if parser.lines.is_empty() {
            return Ok(Self::default());
        }

        let indent = parser.lines[0].indent;
        if parser.lines[0].is_seq_item() {
            return Err(Error::metadata(
                parser.lines[0].number,
                "expected `key: value` pairs, found a list",
            ));
        }

        let entries = parser.parse_map(indent)?;
        if let Some(line) = parser.lines.get(parser.pos) {
            return Err(Error::metadata(line.number, "unexpected indentation"));
        }
        Ok(Self { entries })
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Look up a key and render it as a scalar string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(MetaValue::as_scalar_string)
    }

    /// Look up a boolean key.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(MetaValue::as_bool)
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One significant (non-blank, non-comment) line.
#[derive(Debug, Clone)]
struct Line {
    number: usize,
    indent: usize,
    text: String,
}

impl Line {
    fn is_seq_item(&self) -> bool {
        self.text == "-" || self.text.starts_with("- ")
    }
}

struct BlockParser {
    lines: Vec<Line>,
    pos: usize,
}

impl BlockParser {
    fn new(raw: &[String], first_line: usize) -> Result<Self> {
        let mut lines = Vec::new();
        for (i, line) in raw.iter().enumerate() {
            let number = first_line + i;
            let content = strip_comment(line);
            let trimmed = content.trim_end();
            if trimmed.trim().is_empty() {
                continue;
            }
            let body = trimmed.trim_start_matches(' ');
            if body.starts_with('\t') {
                return Err(Error::metadata(number, "tabs are not allowed for indentation"));
            }
            lines.push(Line {
                number,
                indent: trimmed.len() - body.len(),
                text: body.to_string(),
            });
        }
        Ok(Self { lines, pos: 0 })
    }

    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    /// Parse whatever block starts at the current line.
    fn parse_block(&mut self, indent: usize) -> Result<MetaValue> {
        match self.peek() {
            Some(line) if line.is_seq_item() => Ok(MetaValue::List(self.parse_seq(indent)?)),
            Some(_) => Ok(MetaValue::Map(self.parse_map(indent)?)),
            None => Ok(MetaValue::Null),
        }
    }

    fn parse_map(&mut self, indent: usize) -> Result<Vec<(String, MetaValue)>> {
        let mut entries: Vec<(String, MetaValue)> = Vec::new();

        while let Some(line) = self.peek().cloned() {
            if line.indent < indent || (line.indent == indent && line.is_seq_item()) {
                break;
            }
            if line.indent > indent {
                return Err(Error::metadata(line.number, "unexpected indentation"));
            }

            let Some((key, rest)) = split_key(&line.text) else {
                return Err(Error::metadata(
                    line.number,
                    format!("expected `key: value`, found `{}`", line.text),
                ));
            };
            let key = unquote_key(key, line.number)?;
            self.pos += 1;

            let value = if rest.is_empty() {
                match self.peek() {
                    Some(next) if next.indent > indent => {
                        let child = next.indent;
                        self.parse_block(child)?
                    }
                    Some(next) if next.indent == indent && next.is_seq_item() => {
                        MetaValue::List(self.parse_seq(indent)?)
                    }
                    _ => MetaValue::Null,
                }
            } else {
                parse_inline(rest, line.number)?
            };

            // Later duplicates win.
            if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
                existing.1 = value;
            } else {
                entries.push((key, value));
            }
        }

        Ok(entries)
    }

    fn parse_seq(&mut self, indent: usize) -> Result<Vec<MetaValue>> {
        let mut items = Vec::new();

        while let Some(line) = self.peek().cloned() {
            if line.indent != indent || !line.is_seq_item() {
                if line.indent > indent {
                    return Err(Error::metadata(line.number, "unexpected indentation"));
                }
                break;
            }

            let rest = line.text[1..].trim_start();
            if rest.is_empty() {
                self.pos += 1;
                match self.peek() {
                    Some(next) if next.indent > indent => {
                        let child = next.indent;
                        items.push(self.parse_block(child)?);
                    }
                    _ => items.push(MetaValue::Null),
                }
            } else if split_key(rest).is_some() && !starts_flow(rest) {
                // Compact mapping: re-anchor the item text at its own column.
                let column = indent + (line.text.len() - rest.len());
                self.lines[self.pos] = Line {
                    number: line.number,
                    indent: column,
                    text: rest.to_string(),
                };
                items.push(MetaValue::Map(self.parse_map(column)?));
            } else {
                self.pos += 1;
                items.push(parse_inline(rest, line.number)?);
            }
        }

        Ok(items)
    }
}

fn starts_flow(text: &str) -> bool {
    text.starts_with('[') || text.starts_with('{') || text.starts_with('"') || text.starts_with('\'')
}

/// Remove a trailing `# comment` that sits outside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev_is_space = true;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' if prev_is_space => quote = Some(c),
                '#' if prev_is_space => return &line[..i],
                _ => {}
            },
        }
        prev_is_space = c.is_whitespace();
    }
    line
}

/// Split `key: rest` at the first mapping colon outside quotes and brackets.
fn split_key(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let bytes = text.as_bytes();

    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' if i == 0 => quote = Some(c),
                '[' | '{' | '(' => depth += 1,
                ']' | '}' | ')' => depth = depth.saturating_sub(1),
                ':' if depth == 0 => {
                    let next = bytes.get(i + 1).copied();
                    if next.is_none() || next == Some(b' ') {
                        return Some((text[..i].trim_end(), text[i + 1..].trim()));
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn unquote_key(key: &str, line: usize) -> Result<String> {
    if key.is_empty() {
        return Err(Error::metadata(line, "empty key"));
    }
    match parse_inline(key, line)? {
        MetaValue::Str(s) => Ok(s),
        other => Ok(other.as_scalar_string().unwrap_or_else(|| key.to_string())),
    }
}

/// Parse a value that fits on one line.
fn parse_inline(text: &str, line: usize) -> Result<MetaValue> {
    let text = text.trim();

    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| Error::metadata(line, "unterminated flow sequence"))?;
        if inner.trim().is_empty() {
            return Ok(MetaValue::List(Vec::new()));
        }
        return split_top_level(inner)
            .iter()
            .filter(|item| !item.is_empty())
            .map(|item| parse_flow_item(item, line))
            .collect::<Result<Vec<_>>>()
            .map(MetaValue::List);
    }

    if let Some(inner) = text.strip_prefix('{') {
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| Error::metadata(line, "unterminated flow mapping"))?;
        let mut entries = Vec::new();
        for item in split_top_level(inner).iter().filter(|i| !i.is_empty()) {
            entries.push(parse_flow_pair(item, line)?);
        }
        return Ok(MetaValue::Map(entries));
    }

    if text.starts_with('"') || text.starts_with('\'') {
        return parse_quoted(text, line).map(MetaValue::Str);
    }

    if text.starts_with('|') || text.starts_with('>') {
        return Err(Error::metadata(line, "multi-line scalars are not supported"));
    }

    if text.contains(": ") || text.ends_with(':') {
        return Err(Error::metadata(line, "mapping values are not allowed here"));
    }

    Ok(resolve_plain(text))
}

/// A flow sequence item is a scalar, a nested flow, or a single pair.
fn parse_flow_item(item: &str, line: usize) -> Result<MetaValue> {
    if !starts_flow(item) && split_key(item).is_some() {
        let (key, value) = parse_flow_pair(item, line)?;
        return Ok(MetaValue::Map(vec![(key, value)]));
    }
    parse_inline(item, line)
}

fn parse_flow_pair(item: &str, line: usize) -> Result<(String, MetaValue)> {
    match split_key(item) {
        Some((key, rest)) => {
            let key = unquote_key(key, line)?;
            let value = if rest.is_empty() {
                MetaValue::Null
            } else {
                parse_inline(rest, line)?
            };
            Ok((key, value))
        }
        None => Ok((unquote_key(item, line)?, MetaValue::Null)),
    }
}

fn parse_quoted(text: &str, line: usize) -> Result<String> {
    let mut chars = text.chars();
    let quote = chars.next().unwrap_or('"');
    let mut out = String::new();
    let mut closed_at = None;
    let rest: Vec<char> = chars.collect();
    let mut i = 0;

    while i < rest.len() {
        let c = rest[i];
        if quote == '\'' && c == '\'' {
            if rest.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            closed_at = Some(i);
            break;
        }
        if quote == '"' && c == '\\' {
            match rest.get(i + 1) {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(*other);
                }
                None => return Err(Error::metadata(line, "unterminated string")),
            }
            i += 2;
            continue;
        }
        if quote == '"' && c == '"' {
            closed_at = Some(i);
            break;
        }
        out.push(c);
        i += 1;
    }

    match closed_at {
        Some(end) if rest[end + 1..].iter().all(|c| c.is_whitespace()) => Ok(out),
        Some(_) => Err(Error::metadata(line, "unexpected text after quoted string")),
        None => Err(Error::metadata(line, "unterminated string")),
    }
}

fn resolve_plain(text: &str) -> MetaValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return MetaValue::Null,
        "true" | "True" | "TRUE" | "yes" | "Yes" | "on" | "On" => return MetaValue::Bool(true),
        "false" | "False" | "FALSE" | "no" | "No" | "off" | "Off" => {
            return MetaValue::Bool(false);
        }
        _ => {}
    }

    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = text.parse::<i64>() {
            return MetaValue::Int(i);
        }
    }
    if digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E')
    {
        if let Ok(f) = text.parse::<f64>() {
            return MetaValue::Float(f);
        }
    }

    MetaValue::Str(text.to_string())
}
