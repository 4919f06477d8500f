//! Values that flow between compilation steps.

use crate::dom::{Document, Fragment};
use crate::manifest::{PageManifest, TemplateManifest};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// A page body parsed into top-level nodes, tagged with its manifest.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub manifest: Rc<PageManifest>,
    pub content: Fragment,
}

/// A template document, tagged with its manifest.
///
/// Instances handed to pages are clones owned by the caller; the cached
/// original never leaves [`TemplateCache`](crate::cache::TemplateCache).
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub manifest: Rc<TemplateManifest>,
    pub document: Document,
}

/// A fully assembled page, ready to be written.
#[derive(Debug, Clone)]
pub struct OutputPage {
    pub page: Rc<PageManifest>,
    pub template: Option<Rc<TemplateManifest>>,
    pub document: Document,
}

/// A non-fatal condition met while building. Rendering carries on with a
/// defined fallback; these are collected into the build report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The template has no placeholder, so the page content was dropped.
    MissingPlaceholder { template: String, page: PathBuf },
    /// A macro marker named a key no scope defines; the key was inserted.
    UnknownMacro { key: String, page: PathBuf },
    /// A macro marker had no `key` attribute.
    MissingMacroKey { page: PathBuf },
    /// An artifact path was already present in the fresh output directory.
    ArtifactOverwritten { path: PathBuf },
    /// A `[macros]` entry was an array or table.
    SkippedMacroValue { manifest: PathBuf, key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingPlaceholder { template, page } => write!(
                f,
                "template `{template}` has no placeholder; content of {} not inserted",
                page.display()
            ),
            Diagnostic::UnknownMacro { key, page } => {
                write!(f, "unknown macro `{key}` in {}", page.display())
            }
            Diagnostic::MissingMacroKey { page } => {
                write!(f, "macro marker without a key in {}", page.display())
            }
            Diagnostic::ArtifactOverwritten { path } => {
                write!(f, "artifact {} already existed and was replaced", path.display())
            }
            Diagnostic::SkippedMacroValue { manifest, key } => write!(
                f,
                "macro `{key}` in {} is not a scalar and was ignored",
                manifest.display()
            ),
        }
    }
}
