//! Notebook files and project builds for kiln.
//!
//! # Architecture
//!
//! ```text
//! source tree ──► Walker ──► *.ipynb ──► read_notebook ──► compile_notebook ──► build/*.py
//!                   │                                      (rayon, one per notebook)
//!                   ├──► IgnoreList (.kilnignore)
//!                   └──► other files ─────────────────────────────────────────► build/
//! ```

mod error;
mod ignore;
mod ipynb;
mod project;
mod watcher;

pub use error::{NotebookError, NotebookResult};
pub use ignore::{DEFAULT_IGNORE, IgnoreList, fnmatch};
pub use ipynb::{CellSource, JupyterCell, JupyterNotebook, read_notebook};
pub use project::{BuildConfig, BuildDiagnostic, BuildReport, build_project, compile_file};
pub use watcher::{FileEvent, FileWatcher};
