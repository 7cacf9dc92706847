//! Integration tests for project builds.
//!
//! Builds a small source tree in a temporary directory and checks the
//! mirrored output.

use std::fs;
use std::path::Path;

use kiln_core::{MANAGER_MODULE, MANAGER_MODULE_FILE, PREAMBLE, Severity};
use kiln_notebook::{BuildConfig, build_project};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Write an nbformat-4 notebook whose code cells hold the given sources.
fn write_notebook(path: &Path, cells: &[&str]) {
    let cells: Vec<serde_json::Value> = cells
        .iter()
        .map(|source| {
            serde_json::json!({
                "cell_type": "code",
                "metadata": {},
                "outputs": [],
                "execution_count": null,
                "source": source.split_inclusive('\n').collect::<Vec<_>>(),
            })
        })
        .collect();
    let notebook = serde_json::json!({
        "nbformat": 4,
        "nbformat_minor": 5,
        "metadata": {},
        "cells": cells,
    });
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_string_pretty(&notebook).unwrap()).unwrap();
}

/// A source tree with notebooks at the root and in a subdirectory.
fn sample_project() -> TempDir {
    let temp = temp_dir();
    let root = temp.path();

    write_notebook(
        &root.join("api.ipynb"),
        &["# @HTTP GET /health\ndef health():\n    return {'ok': True}"],
    );
    write_notebook(
        &root.join("jobs").join("nightly.ipynb"),
        &["# @SCHEDULE\n# cron: 0 0 3 * * *\nprint('nightly')"],
    );
    write_notebook(&root.join("play_sandbox.ipynb"), &["x = 1"]);
    write_notebook(&root.join(".ipynb_checkpoints").join("api-checkpoint.ipynb"), &["x = 1"]);
    fs::write(root.join("util.py"), "def helper():\n    return 1\n").unwrap();
    fs::write(root.join("secret.env"), "TOKEN=1\n").unwrap();
    fs::write(root.join(".kilnignore"), "*.env\n.kilnignore\n").unwrap();
    temp
}

fn build(root: &Path) -> (kiln_notebook::BuildReport, std::path::PathBuf) {
    let out = root.join("build");
    let report = build_project(&BuildConfig::new(root)).expect("build succeeds");
    (report, out)
}

// =============================================================================
// Tree mirroring
// =============================================================================

#[test]
fn test_notebooks_compile_to_modules() {
    let temp = sample_project();
    let (report, out) = build(temp.path());

    assert_eq!(report.notebooks, 2);
    let api = fs::read_to_string(out.join("api.py")).unwrap();
    assert!(api.starts_with(PREAMBLE));
    assert!(api.contains("@router.get('/health')"));

    let nightly = fs::read_to_string(out.join("jobs").join("nightly.py")).unwrap();
    assert!(nightly.contains("@scheduler.scheduled_job('cron'"));
}

#[test]
fn test_sandbox_and_checkpoints_skipped() {
    let temp = sample_project();
    let (_, out) = build(temp.path());

    assert!(!out.join("play_sandbox.py").exists());
    assert!(!out.join("play_sandbox.ipynb").exists());
    assert!(!out.join(".ipynb_checkpoints").exists());
}

#[test]
fn test_other_files_copied_unless_ignored() {
    let temp = sample_project();
    let (report, out) = build(temp.path());

    assert_eq!(report.copied, 1);
    assert_eq!(
        fs::read_to_string(out.join("util.py")).unwrap(),
        "def helper():\n    return 1\n"
    );
    assert!(!out.join("secret.env").exists());
    assert!(!out.join(".kilnignore").exists());
}

#[test]
fn test_package_init_and_manager_module() {
    let temp = sample_project();
    let (_, out) = build(temp.path());

    assert_eq!(fs::read_to_string(out.join("jobs").join("__init__.py")).unwrap(), "");
    assert!(!out.join("__init__.py").exists());
    assert_eq!(
        fs::read_to_string(out.join(MANAGER_MODULE_FILE)).unwrap(),
        MANAGER_MODULE
    );
}

#[test]
fn test_rebuild_does_not_descend_into_build_dir() {
    let temp = sample_project();
    build(temp.path());
    let (report, out) = build(temp.path());

    assert_eq!(report.notebooks, 2);
    assert!(!out.join("build").exists());
}

#[test]
fn test_negated_pattern_reincludes() {
    let temp = sample_project();
    fs::write(temp.path().join(".kilnignore"), "*.env\n!secret.env\n").unwrap();
    let (_, out) = build(temp.path());
    assert!(out.join("secret.env").exists());
}

// =============================================================================
// Failure isolation
// =============================================================================

#[test]
fn test_broken_notebook_reported_and_build_continues() {
    let temp = sample_project();
    fs::write(temp.path().join("broken.ipynb"), "{ not json").unwrap();
    let (report, out) = build(temp.path());

    assert_eq!(report.notebooks, 2);
    assert!(out.join("api.py").exists());
    assert!(!out.join("broken.py").exists());

    let diag = report
        .diagnostics
        .iter()
        .find(|d| d.path == Path::new("broken.ipynb"))
        .expect("diagnostic for broken notebook");
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.cell, None);
}

#[test]
fn test_cell_diagnostics_carry_file() {
    let temp = temp_dir();
    write_notebook(
        &temp.path().join("ws.ipynb"),
        &["x = 1", "# @WS /ws\nno_function = True"],
    );
    let (report, _) = build(temp.path());

    assert_eq!(report.skipped_cells, 1);
    assert!(report.has_errors());
    let diag = &report.diagnostics[0];
    assert_eq!(diag.path, Path::new("ws.ipynb"));
    assert_eq!(diag.cell, Some(1));
    assert!(diag.to_string().starts_with("ws.ipynb:cell 1: error:"));
}
