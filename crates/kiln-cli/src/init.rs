//! Init command implementation.

use std::fs;
use std::path::Path;

use kiln_notebook::DEFAULT_IGNORE;

use crate::colors;

/// Write the default `.kilnignore` into `dir` unless one exists.
pub fn execute(dir: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = dir.as_ref().join(".kilnignore");
    if path.exists() {
        println!(
            "{}{} already exists, leaving it unchanged{}",
            colors::DIM,
            path.display(),
            colors::RESET
        );
        return Ok(());
    }

    fs::write(&path, DEFAULT_IGNORE)?;
    println!("{}Created:{} {}", colors::GREEN, colors::RESET, path.display());
    Ok(())
}
