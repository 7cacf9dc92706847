//! Build command implementation.

use std::time::Instant;

use kiln_core::Severity;
use kiln_notebook::{BuildConfig, BuildReport, build_project};

use crate::colors;

/// Build a project and print its diagnostics.
pub fn execute(config: &BuildConfig) -> anyhow::Result<()> {
    if !config.source_dir.is_dir() {
        anyhow::bail!("Source directory not found: {}", config.source_dir.display());
    }

    println!(
        "\n{}kiln{} - Building {}{}{}\n",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        config.source_dir.display(),
        colors::RESET
    );

    let start = Instant::now();
    let report = build_project(config)?;
    print_report(&report);

    println!(
        "{}Built:{} {}",
        colors::GREEN,
        colors::RESET,
        config.build_dir.display()
    );
    println!(
        "{}Time:{} {:.2}s",
        colors::DIM,
        colors::RESET,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Print diagnostics and the per-build counts.
pub fn print_report(report: &BuildReport) {
    for diag in &report.diagnostics {
        let color = match diag.severity {
            Severity::Warning => colors::YELLOW,
            Severity::Error => colors::RED,
        };
        eprintln!("{}{}{}", color, diag, colors::RESET);
    }
    if !report.diagnostics.is_empty() {
        eprintln!();
    }

    println!(
        "{}✓{} {} notebooks compiled, {} files copied, {} cells skipped",
        colors::GREEN,
        colors::RESET,
        report.notebooks,
        report.copied,
        report.skipped_cells
    );
}
