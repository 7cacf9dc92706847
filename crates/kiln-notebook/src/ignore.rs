//! `.kilnignore` handling.
//!
//! Patterns use shell-style matching, one per line. `#` starts a comment
//! line and `!pattern` re-includes anything it matches, regardless of
//! where it appears in the file.

use std::fs;
use std::path::Path;

use crate::error::{NotebookError, NotebookResult};

/// Template written by `kiln init`.
pub const DEFAULT_IGNORE: &str = "\
# Files and folders kiln leaves out of the build.
# Shell-style patterns; prefix with ! to re-include.
.git
.venv
venv
__pycache__
*.pyc
.ipynb_checkpoints
.kilnignore
build
*.log
.env
";

/// Parsed ignore patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    patterns: Vec<String>,
    negated: Vec<String>,
}

impl IgnoreList {
    /// Build from the lines of an ignore file.
    pub fn parse(text: &str) -> Self {
        let mut list = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.starts_with('#') {
                continue;
            }
            match line.strip_prefix('!') {
                Some(pattern) => list.negated.push(pattern.to_string()),
                None => list.patterns.push(line.to_string()),
            }
        }
        list
    }

    /// Read an ignore file. A missing file yields an empty list.
    pub fn from_file(path: impl AsRef<Path>) -> NotebookResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| NotebookError::read(path, e))?;
        Ok(Self::parse(&text))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.negated.is_empty()
    }

    /// Whether `path` is excluded.
    ///
    /// Negations are checked first and win over any ignore pattern.
    pub fn should_ignore(&self, path: &str) -> bool {
        if self.negated.iter().any(|p| fnmatch(p, path)) {
            return false;
        }
        let trimmed = path.trim_end_matches('/');
        self.patterns
            .iter()
            .any(|p| fnmatch(p.trim_end_matches('/'), trimmed) || fnmatch(p, path))
    }
}

/// Case-sensitive shell pattern match over the whole string.
///
/// `*` matches any run of characters (including `/`), `?` one character,
/// `[seq]` and `[!seq]` a character class with optional `a-z` ranges. An
/// unterminated `[` matches itself.
pub fn fnmatch(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match match_class(&pattern, p, text[t]) {
                ClassMatch::Matched(next) => Some(next),
                ClassMatch::NoMatch => None,
                ClassMatch::Literal => (text[t] == '[').then_some(p + 1),
            },
            Some(&c) => (c == text[t]).then_some(p + 1),
            None => None,
        };

        match step {
            Some(next) => {
                p = next;
                t += 1;
            }
            None => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

enum ClassMatch {
    Matched(usize),
    NoMatch,
    /// No closing bracket; `[` is an ordinary character
    Literal,
}

fn match_class(pattern: &[char], open: usize, c: char) -> ClassMatch {
    let mut i = open + 1;
    let negate = matches!(pattern.get(i), Some('!'));
    if negate {
        i += 1;
    }

    let start = i;
    let mut found = false;
    loop {
        let Some(&first) = pattern.get(i) else {
            return ClassMatch::Literal;
        };
        // `]` right after the opening is a member, not the terminator
        if first == ']' && i > start {
            break;
        }
        if pattern.get(i + 1) == Some(&'-') && pattern.get(i + 2).is_some_and(|&e| e != ']') {
            let last = pattern[i + 2];
            if first <= c && c <= last {
                found = true;
            }
            i += 3;
        } else {
            if first == c {
                found = true;
            }
            i += 1;
        }
    }

    if found != negate {
        ClassMatch::Matched(i + 1)
    } else {
        ClassMatch::NoMatch
    }
}
