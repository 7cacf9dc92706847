//! File watcher for notebook changes.
//!
//! Watches a source tree recursively and reports `.ipynb` changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use tokio::sync::mpsc;

use crate::error::{NotebookError, NotebookResult};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// File change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// Notebook was written or created.
    Modified(PathBuf),
    /// Notebook was removed.
    Removed(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Modified(path) | Self::Removed(path) => path,
        }
    }
}

/// Whether a changed path should trigger a rebuild.
fn is_watched(path: &Path) -> bool {
    if path.extension().is_none_or(|ext| ext != "ipynb") {
        return false;
    }
    !path.components().any(|c| c.as_os_str() == ".ipynb_checkpoints")
}

/// File watcher handle.
pub struct FileWatcher {
    /// Debouncer handle (kept alive to maintain watcher).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Receiver for file events.
    rx: mpsc::UnboundedReceiver<FileEvent>,
}

impl FileWatcher {
    /// Watch `root` and everything below it.
    pub fn new(root: impl AsRef<Path>) -> NotebookResult<Self> {
        let root = root.as_ref();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            let Ok(events) = result else {
                return;
            };
            for event in events {
                if !is_watched(&event.path) {
                    continue;
                }
                let file_event = if event.path.exists() {
                    FileEvent::Modified(event.path)
                } else {
                    FileEvent::Removed(event.path)
                };
                let _ = tx.send(file_event);
            }
        })
        .map_err(|e| NotebookError::Watch(e.to_string()))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| NotebookError::Watch(e.to_string()))?;
        tracing::debug!(root = %root.display(), "watching for notebook changes");

        Ok(Self {
            _debouncer: debouncer,
            rx,
        })
    }

    /// Receive the next file event.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        self.rx.recv().await
    }
}
