//! Per-compilation state.

/// State threaded through the compilation of one notebook.
///
/// Holds the counter used to name synthesized scheduled-job functions.
/// Each notebook becomes its own Python module, so a fresh context per
/// notebook never produces colliding names and notebooks can compile
/// independently.
#[derive(Debug, Clone, Default)]
pub struct CompileContext {
    next_generated: usize,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next synthesized function name (`generated_func_<n>`).
    pub fn next_generated_name(&mut self) -> String {
        let name = format!("generated_func_{}", self.next_generated);
        self.next_generated += 1;
        name
    }

    /// Number of names handed out since creation or the last reset.
    pub fn generated_count(&self) -> usize {
        self.next_generated
    }

    /// Restart numbering at zero.
    ///
    /// Call between independent compilations that must produce
    /// byte-identical output for identical input.
    pub fn reset(&mut self) {
        self.next_generated = 0;
    }
}
