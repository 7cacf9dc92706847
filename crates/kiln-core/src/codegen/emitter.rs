//! Text output for rendered Python.
//!
//! Indentation is four spaces per level. Blank lines never carry
//! trailing whitespace.

/// String buffer that the IR renders into.
#[derive(Debug, Default)]
pub struct Emitter {
    buffer: String,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit one indented line followed by a newline.
    pub fn line(&mut self, level: usize, text: &str) {
        if text.is_empty() {
            self.blank();
            return;
        }
        self.indent(level);
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Emit an empty line.
    pub fn blank(&mut self) {
        self.buffer.push('\n');
    }

    fn indent(&mut self, level: usize) {
        for _ in 0..level * 4 {
            self.buffer.push(' ');
        }
    }

    /// Emit a block of existing code, shifted to `level`.
    ///
    /// The indentation shared by all non-blank lines is removed first, so
    /// relative indentation inside the block is preserved.
    pub fn verbatim(&mut self, level: usize, code: &str) {
        let common = code
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.len() - l.trim_start().len())
            .min()
            .unwrap_or(0);

        for line in code.lines() {
            if line.trim().is_empty() {
                self.blank();
            } else {
                let shifted = line.get(common..).unwrap_or_else(|| line.trim_start());
                self.line(level, shifted.trim_end());
            }
        }
    }

    /// Ensure the buffer ends with exactly `count` blank lines.
    pub fn ensure_blank_lines(&mut self, count: usize) {
        if self.buffer.is_empty() {
            return;
        }
        while self.buffer.ends_with("\n\n") {
            self.buffer.pop();
        }
        if !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
        for _ in 0..count {
            self.buffer.push('\n');
        }
    }

    /// Finish rendering, dropping trailing blank lines.
    pub fn output(mut self) -> String {
        while self.buffer.ends_with('\n') {
            self.buffer.pop();
        }
        self.buffer
    }
}
