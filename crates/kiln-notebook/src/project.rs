//! Project builds.
//!
//! Mirrors a source tree into the build directory: notebooks become
//! Python modules, everything else is copied as-is.
//!
//! ```text
//! source/                         build/
//! ├── api.ipynb          ──────►  ├── api.py
//! ├── util.py            ──────►  ├── util.py
//! ├── play_sandbox.ipynb          ├── websocket_manager.py
//! └── jobs/                       └── jobs/
//!     └── nightly.ipynb  ──────►      ├── __init__.py
//!                                     └── nightly.py
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use kiln_core::{
    CompileContext, CompiledUnit, MANAGER_MODULE, MANAGER_MODULE_FILE, Severity, compile_notebook,
};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{NotebookError, NotebookResult};
use crate::ignore::IgnoreList;
use crate::ipynb::read_notebook;

/// Jupyter writes autosave copies here.
const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Notebooks ending in this are scratch space and never built.
const SANDBOX_SUFFIX: &str = "sandbox.ipynb";

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Root of the notebook tree
    pub source_dir: PathBuf,

    /// Where compiled modules are written
    pub build_dir: PathBuf,

    /// Ignore file; relative paths are resolved against `source_dir`
    pub ignore_file: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            build_dir: PathBuf::from("./build"),
            ignore_file: PathBuf::from(".kilnignore"),
        }
    }
}

impl BuildConfig {
    /// Configuration for a source tree, with the build directory inside it.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            build_dir: source_dir.join("build"),
            source_dir,
            ..Self::default()
        }
    }

    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    pub fn with_ignore_file(mut self, ignore_file: impl Into<PathBuf>) -> Self {
        self.ignore_file = ignore_file.into();
        self
    }

    /// Resolved location of the ignore file.
    pub fn ignore_path(&self) -> PathBuf {
        if self.ignore_file.is_absolute() {
            self.ignore_file.clone()
        } else {
            self.source_dir.join(&self.ignore_file)
        }
    }
}

/// A compile diagnostic tied to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostic {
    /// Notebook path relative to the source root
    pub path: PathBuf,

    /// Cell index, absent when the notebook as a whole failed
    pub cell: Option<usize>,

    pub severity: Severity,

    pub message: String,
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell {
            Some(cell) => write!(
                f,
                "{}:cell {}: {}: {}",
                self.path.display(),
                cell,
                self.severity,
                self.message
            ),
            None => write!(f, "{}: {}: {}", self.path.display(), self.severity, self.message),
        }
    }
}

/// Summary of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Notebooks compiled to modules
    pub notebooks: usize,

    /// Other files copied unchanged
    pub copied: usize,

    /// Annotated cells that produced no output, across all notebooks
    pub skipped_cells: usize,

    /// Diagnostics in notebook path order
    pub diagnostics: Vec<BuildDiagnostic>,
}

impl BuildReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }
}

/// Files discovered under the source root, as relative paths.
#[derive(Debug, Default)]
struct SourceTree {
    dirs: Vec<PathBuf>,
    notebooks: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

struct Walker<'a> {
    root: &'a Path,
    build_dir: PathBuf,
    ignore: &'a IgnoreList,
}

impl Walker<'_> {
    fn walk(&self, dir: &Path, tree: &mut SourceTree) -> NotebookResult<()> {
        let abs = self.root.join(dir);
        let mut entries = fs::read_dir(&abs)
            .map_err(|e| NotebookError::read(&abs, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| NotebookError::read(&abs, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let rel = dir.join(name.as_ref());
            if self.is_ignored(&rel, &name) {
                tracing::debug!(path = %rel.display(), "ignored");
                continue;
            }

            let path = entry.path();
            if path.is_dir() {
                if name == CHECKPOINT_DIR || self.is_build_dir(&path) {
                    continue;
                }
                tree.dirs.push(rel.clone());
                self.walk(&rel, tree)?;
            } else if name.ends_with(".ipynb") {
                if !name.ends_with(SANDBOX_SUFFIX) {
                    tree.notebooks.push(rel);
                }
            } else {
                tree.files.push(rel);
            }
        }
        Ok(())
    }

    fn is_ignored(&self, rel: &Path, name: &str) -> bool {
        self.ignore.should_ignore(&slash_path(rel)) || self.ignore.should_ignore(name)
    }

    fn is_build_dir(&self, path: &Path) -> bool {
        path.canonicalize().is_ok_and(|p| p == self.build_dir)
    }
}

/// Relative path with `/` separators, as ignore patterns expect.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compile one notebook file with a fresh context.
pub fn compile_file(path: impl AsRef<Path>) -> NotebookResult<CompiledUnit> {
    let records = read_notebook(path)?;
    Ok(compile_notebook(&records, &mut CompileContext::new()))
}

fn write_file(path: &Path, contents: &str) -> NotebookResult<()> {
    fs::write(path, contents).map_err(|e| NotebookError::write(path, e))
}

/// Build a project tree.
///
/// Per-notebook failures are reported in the returned [`BuildReport`];
/// only I/O failures on the build directory itself are returned as errors.
pub fn build_project(config: &BuildConfig) -> NotebookResult<BuildReport> {
    let ignore = IgnoreList::from_file(config.ignore_path())?;
    fs::create_dir_all(&config.build_dir).map_err(|e| NotebookError::write(&config.build_dir, e))?;
    let build_dir = config
        .build_dir
        .canonicalize()
        .map_err(|e| NotebookError::write(&config.build_dir, e))?;

    let walker = Walker {
        root: &config.source_dir,
        build_dir,
        ignore: &ignore,
    };
    let mut tree = SourceTree::default();
    walker.walk(Path::new(""), &mut tree)?;

    for dir in &tree.dirs {
        let target = config.build_dir.join(dir);
        fs::create_dir_all(&target).map_err(|e| NotebookError::write(&target, e))?;
    }

    let mut report = BuildReport::default();
    for file in &tree.files {
        let (from, to) = (config.source_dir.join(file), config.build_dir.join(file));
        fs::copy(&from, &to).map_err(|e| NotebookError::write(&to, e))?;
        report.copied += 1;
    }

    // Each notebook is its own module with its own counter, so they compile independently
    let units: Vec<(&PathBuf, NotebookResult<CompiledUnit>)> = tree
        .notebooks
        .par_iter()
        .map(|rel| (rel, compile_file(config.source_dir.join(rel))))
        .collect();

    let mut packages = BTreeSet::new();
    for (rel, unit) in units {
        let unit = match unit {
            Ok(unit) => unit,
            Err(e) => {
                tracing::error!(path = %rel.display(), "{}", e);
                report.diagnostics.push(BuildDiagnostic {
                    path: rel.clone(),
                    cell: None,
                    severity: Severity::Error,
                    message: e.to_string(),
                });
                continue;
            }
        };

        write_file(&config.build_dir.join(rel).with_extension("py"), &unit.source)?;
        report.notebooks += 1;
        report.skipped_cells += unit.skipped;
        report
            .diagnostics
            .extend(unit.diagnostics.into_iter().map(|d| BuildDiagnostic {
                path: rel.clone(),
                cell: Some(d.cell),
                severity: d.severity,
                message: d.message,
            }));

        if let Some(parent) = rel.parent().filter(|p| !p.as_os_str().is_empty()) {
            packages.insert(parent.to_path_buf());
        }
    }

    for package in packages {
        write_file(&config.build_dir.join(package).join("__init__.py"), "")?;
    }
    write_file(&config.build_dir.join(MANAGER_MODULE_FILE), MANAGER_MODULE)?;

    tracing::info!(
        notebooks = report.notebooks,
        copied = report.copied,
        skipped_cells = report.skipped_cells,
        "build finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.source_dir, PathBuf::from("."));
        assert_eq!(config.build_dir, PathBuf::from("./build"));
        assert_eq!(config.ignore_path(), PathBuf::from("./.kilnignore"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = BuildConfig::new("/src")
            .with_build_dir("/out")
            .with_ignore_file("/etc/kilnignore");
        assert_eq!(config.build_dir, PathBuf::from("/out"));
        assert_eq!(config.ignore_path(), PathBuf::from("/etc/kilnignore"));
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(&Path::new("a").join("b").join("c.ipynb")), "a/b/c.ipynb");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = BuildDiagnostic {
            path: PathBuf::from("api.ipynb"),
            cell: Some(3),
            severity: Severity::Warning,
            message: "msg".into(),
        };
        assert_eq!(diag.to_string(), "api.ipynb:cell 3: warning: msg");
    }
}
