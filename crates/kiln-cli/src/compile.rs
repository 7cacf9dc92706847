//! Compile command implementation.
//!
//! Compiles one notebook; the module goes to stdout unless an output file
//! is given, and diagnostics always go to stderr.

use std::fs;
use std::path::Path;

use kiln_core::Severity;
use kiln_notebook::compile_file;

use crate::colors;

pub fn execute(notebook: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    if !notebook.exists() {
        anyhow::bail!("Notebook not found: {}", notebook.display());
    }

    let unit = compile_file(notebook)?;
    for diag in &unit.diagnostics {
        let color = match diag.severity {
            Severity::Warning => colors::YELLOW,
            Severity::Error => colors::RED,
        };
        eprintln!("{}{}:{}{}", color, notebook.display(), diag, colors::RESET);
    }

    match output {
        Some(path) => {
            fs::write(path, &unit.source)?;
            eprintln!(
                "{}✓{} {} ({} cells compiled, {} skipped)",
                colors::GREEN,
                colors::RESET,
                path.display(),
                unit.compiled,
                unit.skipped
            );
        }
        None => print!("{}", unit.source),
    }
    Ok(())
}
