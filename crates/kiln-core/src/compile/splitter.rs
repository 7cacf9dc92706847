//! Declaration/body splitting and directive detection.
//!
//! A cell's declaration block is its first chunk of `#` comment lines or
//! its first triple-quoted block. The first line that belongs to neither
//! ends the declaration phase for good: later comments are body.

/// A cell source split into declaration lines and body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSource {
    /// Declaration lines with comment markers removed and common
    /// indentation stripped
    pub declaration: Vec<String>,

    /// Body lines with their original indentation
    pub body: Vec<String>,
}

impl SplitSource {
    /// Body text with surrounding blank lines removed.
    pub fn body_text(&self) -> String {
        let start = self.body.iter().position(|l| !l.trim().is_empty());
        let end = self.body.iter().rposition(|l| !l.trim().is_empty());
        match (start, end) {
            (Some(start), Some(end)) => self.body[start..=end].join("\n"),
            _ => String::new(),
        }
    }
}

/// Directive token selecting a compiled cell kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Http,
    WebSocket,
    Schedule,
}

impl Directive {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Http => "@HTTP",
            Self::WebSocket => "@WS",
            Self::Schedule => "@SCHEDULE",
        }
    }

    /// Match the first whitespace-delimited token of `line`.
    ///
    /// Returns the directive and the trimmed remainder of the line.
    pub fn detect(line: &str) -> Option<(Self, &str)> {
        let line = line.trim();
        let (token, rest) = match line.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (line, ""),
        };
        let directive = match token {
            "@HTTP" => Self::Http,
            "@WS" => Self::WebSocket,
            "@SCHEDULE" => Self::Schedule,
            _ => return None,
        };
        Some((directive, rest))
    }
}

/// Split a cell source into declaration and body.
///
/// Returns `None` when both parts are empty.
pub fn split_source(source: &str) -> Option<SplitSource> {
    let mut declaration: Vec<String> = Vec::new();
    let mut body: Vec<String> = Vec::new();

    let mut in_block: Option<&'static str> = None;
    let mut declaring = true;
    let mut started = false;

    for line in source.lines() {
        if !declaring {
            body.push(line.to_string());
            continue;
        }

        let stripped = line.trim();

        if let Some(delim) = in_block {
            match stripped.find(delim) {
                Some(pos) => {
                    let text = &line[..line.len() - line.trim_start().len() + pos];
                    if !text.trim().is_empty() {
                        declaration.push(text.trim_end().to_string());
                    }
                    in_block = None;
                    declaring = false;
                }
                None => declaration.push(line.trim_end().to_string()),
            }
            continue;
        }

        if !started && stripped.is_empty() {
            continue;
        }
        started = true;

        if let Some(delim) = ["\"\"\"", "'''"].into_iter().find(|d| stripped.starts_with(d)) {
            let rest = &stripped[delim.len()..];
            match rest.find(delim) {
                Some(pos) => {
                    let text = rest[..pos].trim();
                    if !text.is_empty() {
                        declaration.push(text.to_string());
                    }
                    declaring = false;
                }
                None => {
                    if !rest.trim().is_empty() {
                        declaration.push(rest.trim().to_string());
                    }
                    in_block = Some(delim);
                }
            }
            continue;
        }

        if let Some(comment) = stripped.strip_prefix('#') {
            // One space after the marker is separator, not indentation.
            let text = comment.trim_start_matches('#');
            let text = text.strip_prefix(' ').unwrap_or(text);
            declaration.push(text.trim_end().to_string());
            continue;
        }

        declaring = false;
        body.push(line.to_string());
    }

    let declaration = dedent(declaration);
    let body_empty = body.iter().all(|l| l.trim().is_empty());
    if declaration.is_empty() && body_empty {
        return None;
    }

    Some(SplitSource { declaration, body })
}

/// Strip the indentation shared by all non-blank lines.
fn dedent(lines: Vec<String>) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .into_iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                l.get(common..).unwrap_or_else(|| l.trim_start()).to_string()
            }
        })
        .filter(|l| !l.is_empty())
        .collect()
}
