//! Site discovery.
//!
//! Turns a site directory into a [`Site`]: the parsed `wobsite.toml`, the
//! `[compile]` settings, every template manifest and every page manifest.
//! Nothing is compiled here, and nothing is written.
//!
//! ## Directory Structure
//!
//! ```text
//! site/
//! ├── wobsite.toml                 # Site manifest
//! ├── templates/
//! │   ├── base.template.toml       # name defaults to "base"
//! │   └── base.html
//! ├── pages/
//! │   ├── index.page.toml
//! │   ├── index.md
//! │   ├── about.page.toml
//! │   └── about.html
//! └── static/                      # Asset directory, copied verbatim
//!     └── style.css
//! ```
//!
//! ## Validation
//!
//! - Every configured template, page and asset directory must exist. All
//!   missing directories are reported together in one error.
//! - Manifests are discovered directly inside each directory (no recursion),
//!   by case-insensitive suffix, sorted by path.
//! - Template names must be unique across the site. A duplicate fails the scan,
//!   so no page of that site is ever compiled.

use crate::config::{CompileConfig, ConfigError};
use crate::manifest::{self, ManifestError, PageManifest, SiteManifest, TemplateManifest};
use crate::naming;
use crate::types::Diagnostic;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("no wobsite.toml found in {}", .0.display())]
    NoSiteManifest(PathBuf),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("missing source directories: {}", join_paths(.0))]
    MissingDirectories(Vec<PathBuf>),
    #[error("duplicate template name `{name}` in {} and {}", .first.display(), .second.display())]
    DuplicateTemplate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("cannot list {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Everything a build needs to know about a site, loaded once.
#[derive(Debug)]
pub struct Site {
    pub manifest: SiteManifest,
    pub config: CompileConfig,
    pub templates: Vec<Rc<TemplateManifest>>,
    pub pages: Vec<Rc<PageManifest>>,
    lookup: HashMap<String, Rc<TemplateManifest>>,
}

impl Site {
    /// Assemble a site from already parsed records, rejecting duplicate
    /// template names.
    pub fn new(
        manifest: SiteManifest,
        config: CompileConfig,
        templates: Vec<TemplateManifest>,
        pages: Vec<PageManifest>,
    ) -> Result<Self, ScanError> {
        let templates: Vec<Rc<TemplateManifest>> = templates.into_iter().map(Rc::new).collect();
        let mut lookup: HashMap<String, Rc<TemplateManifest>> = HashMap::new();
        for template in &templates {
            if let Some(first) = lookup.get(&template.name) {
                return Err(ScanError::DuplicateTemplate {
                    name: template.name.clone(),
                    first: first.path.clone(),
                    second: template.path.clone(),
                });
            }
            lookup.insert(template.name.clone(), Rc::clone(template));
        }
        Ok(Self {
            manifest,
            config,
            templates,
            pages: pages.into_iter().map(Rc::new).collect(),
            lookup,
        })
    }

    pub fn template(&self, name: &str) -> Option<&Rc<TemplateManifest>> {
        self.lookup.get(name)
    }

    /// `[macros]` entries that were dropped because they were not scalars.
    pub fn skipped_macros(&self) -> Vec<Diagnostic> {
        let site = std::iter::once((&self.manifest.path, &self.manifest.macros));
        let templates = self.templates.iter().map(|t| (&t.path, &t.macros));
        let pages = self.pages.iter().map(|p| (&p.path, &p.macros));
        site.chain(templates)
            .chain(pages)
            .flat_map(|(path, macros)| {
                macros.skipped.iter().map(move |key| Diagnostic::SkippedMacroValue {
                    manifest: path.clone(),
                    key: key.clone(),
                })
            })
            .collect()
    }
}

/// Load the site rooted at `root`.
pub fn scan(root: &Path) -> Result<Site, ScanError> {
    let manifest_path = root.join(manifest::SITE_MANIFEST);
    if !manifest_path.is_file() {
        return Err(ScanError::NoSiteManifest(root.to_path_buf()));
    }
    let (site, document) = SiteManifest::load(&manifest_path)?;
    let config = CompileConfig::from_document(&document)?;
    validate_directories(&site)?;

    let mut templates = Vec::new();
    for dir in &site.templates {
        for path in discover(&site.root.join(dir), manifest::TEMPLATE_SUFFIX)? {
            templates.push(TemplateManifest::load(&path)?);
        }
    }

    let mut pages = Vec::new();
    for dir in &site.pages {
        for path in discover(&site.root.join(dir), manifest::PAGE_SUFFIX)? {
            pages.push(PageManifest::load(&path)?);
        }
    }

    tracing::info!(
        site = %site.name,
        templates = templates.len(),
        pages = pages.len(),
        "scanned site"
    );
    Site::new(site, config, templates, pages)
}

/// Check that every configured source directory exists, reporting all
/// missing ones at once.
pub fn validate_directories(site: &SiteManifest) -> Result<(), ScanError> {
    let missing: Vec<PathBuf> = site.source_dirs().filter(|dir| !dir.is_dir()).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ScanError::MissingDirectories(missing))
    }
}

/// Files directly inside `dir` whose name ends with `.{suffix}`, sorted.
pub fn discover(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && naming::has_suffix(&path, suffix) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
