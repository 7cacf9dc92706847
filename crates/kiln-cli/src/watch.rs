//! Watch command implementation.
//!
//! Builds once, then rebuilds the whole project whenever a notebook under
//! the source directory changes.

use kiln_notebook::{BuildConfig, FileEvent, FileWatcher, build_project};

use crate::build::print_report;
use crate::colors;

pub async fn execute(config: &BuildConfig) -> anyhow::Result<()> {
    if !config.source_dir.is_dir() {
        anyhow::bail!("Source directory not found: {}", config.source_dir.display());
    }

    println!(
        "\n{}kiln watch{} - {}{}{}",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        config.source_dir.display(),
        colors::RESET
    );
    println!(
        "{}Watching for notebook changes... (Ctrl+C to stop){}\n",
        colors::DIM,
        colors::RESET
    );

    rebuild(config);

    let mut watcher = FileWatcher::new(&config.source_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create file watcher: {}", e))?;

    loop {
        tokio::select! {
            event = watcher.recv() => match event {
                Some(FileEvent::Modified(path)) => {
                    println!(
                        "\n{}Changed:{} {}",
                        colors::YELLOW,
                        colors::RESET,
                        path.display()
                    );
                    rebuild(config);
                }
                Some(FileEvent::Removed(path)) => {
                    println!(
                        "\n{}Removed:{} {}",
                        colors::YELLOW,
                        colors::RESET,
                        path.display()
                    );
                    rebuild(config);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

/// Rebuild, reporting failures without leaving the watch loop.
fn rebuild(config: &BuildConfig) {
    match build_project(config) {
        Ok(report) => print_report(&report),
        Err(e) => eprintln!("{}Error:{} {}", colors::RED, colors::RESET, e.with_hint()),
    }
}
