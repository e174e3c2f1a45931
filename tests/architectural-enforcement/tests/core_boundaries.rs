//! Integration Test: Core Boundaries
//!
//! `companion-core` is a headless library. It must not end the process and
//! must not link a windowing, terminal UI or audio framework; those belong
//! behind the `Platform` trait.

use std::fs;

use architectural_enforcement::{report, scan_dir, workspace_root};

const UI_CRATES: [&str; 8] = [
    "ratatui", "crossterm", "winit", "gtk", "egui", "iced", "rodio", "cpal",
];

#[test]
fn test_core_never_exits_process() {
    report(
        "Process exits in companion-core",
        &scan_dir("companion/core/src", &["process::exit(", "std::process::abort("]),
    );
}

#[test]
fn test_core_manifest_has_no_ui_dependencies() {
    let manifest = workspace_root().join("companion/core/Cargo.toml");
    let content = fs::read_to_string(&manifest).unwrap();

    let offending: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter(|line| {
            UI_CRATES
                .iter()
                .any(|krate| line.starts_with(&format!("{krate} ")) || line.starts_with(&format!("{krate}=")))
        })
        .collect();

    assert!(
        offending.is_empty(),
        "companion-core depends on UI/audio crates: {offending:?}"
    );
}

#[test]
fn test_core_does_not_print() {
    report(
        "Direct stdout/stderr printing in companion-core (use tracing)",
        &scan_dir("companion/core/src", &["println!(", "eprintln!("]),
    );
}
