//! Shared test utilities for the wobsite test suite.
//!
//! Provides fixture setup (a private copy of `fixtures/site/`, or a minimal
//! generated site) and small extractors over scan and build results.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! write(tmp.path(), "pages/extra.page.toml", "[page]\nfile = \"raw.html\"");
//! let report = crate::generate::build(tmp.path()).unwrap();
//! assert!(artifact_names(&report).contains(&"raw.html".to_string()));
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::generate::BuildReport;
use crate::scan::{self, Site};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            if entry.file_name() == "output" {
                continue;
            }
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// A bare site with empty `templates/` and `pages/` directories plus `files`.
pub fn site_dir(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "wobsite.toml",
        "[site]\ntemplates = \"templates\"\npages = \"pages\"\n",
    );
    std::fs::create_dir_all(tmp.path().join("templates")).unwrap();
    std::fs::create_dir_all(tmp.path().join("pages")).unwrap();
    for (path, content) in files {
        write(tmp.path(), path, content);
    }
    tmp
}

/// A scanned site with no templates and no pages.
pub fn empty_site() -> (TempDir, Site) {
    let tmp = site_dir(&[]);
    let site = scan::scan(tmp.path()).unwrap();
    (tmp, site)
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn append(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str(content);
    std::fs::write(path, text).unwrap();
}

/// Point the fixture's `site.build` somewhere else.
pub fn rewrite_build_dir(root: &Path, build: &str) {
    let path = root.join("wobsite.toml");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("build = \"output\""));
    std::fs::write(
        path,
        text.replace("build = \"output\"", &format!("build = \"{build}\"")),
    )
    .unwrap();
}

// =========================================================================
// Extractors
// =========================================================================

/// Output names of all pages, in discovery order.
pub fn page_outputs(site: &Site) -> Vec<String> {
    site.pages.iter().map(|p| p.output.clone()).collect()
}

/// Artifact paths relative to the output directory, `/`-separated, sorted.
pub fn artifact_names(report: &BuildReport) -> Vec<String> {
    let mut names: Vec<String> = report
        .artifacts
        .iter()
        .map(|p| {
            p.strip_prefix(&report.output_dir)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    names.sort();
    names
}
