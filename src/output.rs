//! CLI output formatting for `check` and `build`.
//!
//! Output leads with what the user declared (template names, page output
//! names) and shows file paths as indented `Source:` context lines, relative
//! to the site root.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Site: Fixture Site
//!
//! Templates
//! 001 bare
//!     Source: templates/bare.html
//! 002 base
//!     Source: templates/base.html
//!
//! Pages
//! 001 about → about.html (template: base)
//!     Source: pages/about.html
//! 002 raw → raw.html
//!     Source: pages/raw.html
//!
//! Assets
//!     static/
//! ```
//!
//! ## Build
//!
//! ```text
//! Artifacts
//! 001 about.html
//! 002 raw.html
//!
//! Failed
//!     pages/lost.page.toml: page pages/lost.page.toml references unknown template `nope`
//!
//! Warnings
//!     unknown macro `titel` in pages/about.page.toml
//!
//! Assets
//!     static/ (2 files)
//!
//! Built 2 pages (1 failed), parsed 1 template → output/
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::generate::BuildReport;
use crate::naming;
use crate::scan::Site;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `path` relative to `root` when it lies below it.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Check output
// ============================================================================

pub fn format_scan_output(site: &Site) -> Vec<String> {
    let root = &site.manifest.root;
    let mut lines = vec![format!("Site: {}", site.manifest.name)];

    if !site.templates.is_empty() {
        lines.push(String::new());
        lines.push("Templates".to_string());
        for (i, template) in site.templates.iter().enumerate() {
            lines.push(format!("{} {}", format_index(i + 1), template.name));
            lines.push(format!("{}Source: {}", indent(1), relative(&template.file, root)));
        }
    }

    if !site.pages.is_empty() {
        lines.push(String::new());
        lines.push("Pages".to_string());
        for (i, page) in site.pages.iter().enumerate() {
            let artifact = naming::artifact_file_name(&page.output, &site.config.output_extension);
            let header = match &page.template {
                Some(name) => format!(
                    "{} {} → {} (template: {})",
                    format_index(i + 1),
                    page.output,
                    artifact,
                    name
                ),
                None => format!("{} {} → {}", format_index(i + 1), page.output, artifact),
            };
            lines.push(header);
            lines.push(format!("{}Source: {}", indent(1), relative(&page.file, root)));
        }
    }

    if !site.manifest.assets.is_empty() {
        lines.push(String::new());
        lines.push("Assets".to_string());
        for dir in &site.manifest.assets {
            lines.push(format!("{}{}/", indent(1), dir));
        }
    }

    lines
}

pub fn print_scan_output(site: &Site) {
    for line in format_scan_output(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

pub fn format_build_output(report: &BuildReport, site_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.artifacts.is_empty() {
        lines.push("Artifacts".to_string());
        for (i, artifact) in report.artifacts.iter().enumerate() {
            lines.push(format!(
                "{} {}",
                format_index(i + 1),
                relative(artifact, &report.output_dir)
            ));
        }
    }

    if !report.failures.is_empty() {
        push_section(&mut lines, "Failed");
        for failure in &report.failures {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                relative(&failure.page, site_root),
                failure.error
            ));
        }
    }

    if !report.diagnostics.is_empty() {
        push_section(&mut lines, "Warnings");
        for diagnostic in &report.diagnostics {
            lines.push(format!("{}{}", indent(1), diagnostic));
        }
    }

    if !report.assets.is_empty() {
        push_section(&mut lines, "Assets");
        for assets in &report.assets {
            lines.push(format!(
                "{}{}/ ({})",
                indent(1),
                assets.dir,
                plural(assets.files, "file")
            ));
        }
    }

    let failed = if report.failures.is_empty() {
        String::new()
    } else {
        format!(" ({} failed)", report.failures.len())
    };
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Built {}{}, parsed {} → {}/",
        plural(report.artifacts.len(), "page"),
        failed,
        plural(report.templates_parsed, "template"),
        relative(&report.output_dir, site_root)
    ));
    lines
}

fn push_section(lines: &mut Vec<String>, title: &str) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(title.to_string());
}

pub fn print_build_output(report: &BuildReport, site_root: &Path) {
    for line in format_build_output(report, site_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
