//! Site generation.
//!
//! Drives a whole build for a scanned [`Site`]:
//!
//! 1. Refuse output directories that would destroy sources (the site root,
//!    an ancestor of it, or anything overlapping a source directory).
//! 2. Remove the output directory and recreate it empty, so no artifact of a
//!    previous build survives.
//! 3. Run the page graph of every page through one
//!    [`CompilationContext`](crate::target::CompilationContext), sharing the
//!    template cache.
//! 4. Copy every asset directory to `<output>/<dir>`.
//!
//! ## Failure policy
//!
//! | Error | Effect |
//! |-------|--------|
//! | structural (graph wiring) | build aborts immediately |
//! | unknown template, `missing_template = "abort-build"` | build aborts |
//! | unknown template, `missing_template = "skip-page"` | page recorded as failed, build continues |
//! | anything else while compiling a page (I/O, parse, format) | page recorded as failed, build continues |
//!
//! A build with failed pages still returns a [`BuildReport`]; callers check
//! [`BuildReport::succeeded`]. Files written before a failure stay on disk.
//!
//! ## Output Structure
//!
//! ```text
//! output/
//! ├── index.html          # page output "index"
//! ├── about.html
//! ├── notes/
//! │   └── index.html      # page output "notes/index"
//! └── static/             # asset directory "static"
//!     └── style.css
//! ```

use crate::config::MissingTemplatePolicy;
use crate::formats::{FormatError, Formats};
use crate::naming;
use crate::pipeline;
use crate::scan::{self, ScanError, Site};
use crate::target::{CompilationContext, CompileError};
use crate::types::Diagnostic;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Format registry error: {0}")]
    Formats(#[from] FormatError),
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("refusing to use {} as output directory: {reason}", .path.display())]
    UnsafeOutputDirectory { path: PathBuf, reason: &'static str },
    #[error("page {} failed: {source}", .page.display())]
    Page { page: PathBuf, source: CompileError },
    #[error("build aborted: {0}")]
    Structural(CompileError),
    #[error("asset copy failed: {0}")]
    Asset(#[from] walkdir::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug)]
pub struct PageFailure {
    /// Page manifest path.
    pub page: PathBuf,
    pub error: CompileError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedAssets {
    /// Asset directory as written in the site manifest.
    pub dir: String,
    pub files: usize,
}

#[derive(Debug)]
pub struct BuildReport {
    pub site: String,
    pub output_dir: PathBuf,
    /// Written artifacts, in page order.
    pub artifacts: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    pub diagnostics: Vec<Diagnostic>,
    pub assets: Vec<CopiedAssets>,
    pub templates_parsed: usize,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Scan the site at `root` and build it.
pub fn build(root: &Path) -> Result<BuildReport, GenerateError> {
    let site = scan::scan(root)?;
    generate(&site)
}

pub fn generate(site: &Site) -> Result<BuildReport, GenerateError> {
    let formats = Formats::standard()?;
    let output_dir = site.manifest.output_dir();
    check_output_dir(site, &output_dir)?;
    prepare_output_dir(&output_dir)?;

    let mut ctx = CompilationContext::new(site, &formats);
    for diagnostic in site.skipped_macros() {
        ctx.warn(diagnostic);
    }

    let failures = compile_pages(&mut ctx)?;
    let assets = copy_assets(site, &output_dir)?;

    tracing::info!(
        artifacts = ctx.artifacts().len(),
        failed = failures.len(),
        "build finished"
    );
    Ok(BuildReport {
        site: site.manifest.name.clone(),
        artifacts: ctx.artifacts().to_vec(),
        templates_parsed: ctx.templates.parse_count(),
        diagnostics: ctx.take_diagnostics(),
        output_dir,
        failures,
        assets,
    })
}

/// Run every page graph of the context's site, applying the failure policy.
fn compile_pages(ctx: &mut CompilationContext<'_>) -> Result<Vec<PageFailure>, GenerateError> {
    let site = ctx.site;
    let mut failures = Vec::new();
    for page in &site.pages {
        let root = pipeline::page_graph(Rc::clone(page));
        let result = ctx.run(&root);
        ctx.forget_values();
        let Err(error) = result else {
            continue;
        };
        if error.is_structural() {
            return Err(GenerateError::Structural(error));
        }
        let abort = matches!(error, CompileError::TemplateNotFound { .. })
            && site.config.missing_template == MissingTemplatePolicy::AbortBuild;
        if abort {
            return Err(GenerateError::Page {
                page: page.path.clone(),
                source: error,
            });
        }
        tracing::warn!(page = %page.path.display(), "page failed: {error}");
        failures.push(PageFailure {
            page: page.path.clone(),
            error,
        });
    }
    Ok(failures)
}

/// Reject output directories whose removal would delete site sources, and
/// page outputs or asset directories that would land outside it.
pub fn check_output_dir(site: &Site, output_dir: &Path) -> Result<(), GenerateError> {
    let root = fs::canonicalize(&site.manifest.root).map_err(io_error(&site.manifest.root))?;
    let output = absolute(&root.join(output_dir.strip_prefix(&site.manifest.root).unwrap_or(output_dir)));
    let unsafe_dir = |reason| {
        Err(GenerateError::UnsafeOutputDirectory {
            path: output_dir.to_path_buf(),
            reason,
        })
    };

    if root.starts_with(&output) {
        return unsafe_dir("it contains the site root");
    }
    if !site.manifest.assets.iter().all(|dir| naming::stays_inside(dir)) {
        return unsafe_dir("an asset directory would be copied outside it");
    }
    if !site.pages.iter().all(|page| naming::stays_inside(&page.output)) {
        return unsafe_dir("a page output would be written outside it");
    }
    for dir in site.manifest.source_dirs() {
        let source = absolute(&root.join(dir.strip_prefix(&site.manifest.root).unwrap_or(&dir)));
        if source.starts_with(&output) {
            return unsafe_dir("it contains a source directory");
        }
        if output.starts_with(&source) {
            return unsafe_dir("it is inside a source directory");
        }
    }
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Remove `output_dir` if present and recreate it empty.
pub fn prepare_output_dir(output_dir: &Path) -> Result<(), GenerateError> {
    if output_dir.exists() {
        tracing::info!(dir = %output_dir.display(), "removing previous output");
        fs::remove_dir_all(output_dir).map_err(io_error(output_dir))?;
    }
    fs::create_dir_all(output_dir).map_err(io_error(output_dir))
}

fn copy_assets(site: &Site, output_dir: &Path) -> Result<Vec<CopiedAssets>, GenerateError> {
    let mut copied = Vec::new();
    for dir in &site.manifest.assets {
        let src = site.manifest.root.join(dir);
        let dst = output_dir.join(dir);
        let mut files = 0;
        for entry in WalkDir::new(&src).sort_by_file_name() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(&src) else {
                continue;
            };
            let target = dst.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(io_error(&target))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(io_error(parent))?;
                }
                fs::copy(entry.path(), &target).map_err(io_error(&target))?;
                files += 1;
            }
        }
        tracing::info!(dir = %dir, files, "copied assets");
        copied.push(CopiedAssets {
            dir: dir.clone(),
            files,
        });
    }
    Ok(copied)
}
