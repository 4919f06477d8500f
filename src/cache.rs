//! Template instantiation cache.
//!
//! Many pages usually share a handful of templates. Reading and parsing a
//! template is the most expensive step of a page build, so within one build
//! each template is parsed at most once and kept here under its name.
//!
//! # Ownership
//!
//! The cache owns the parsed original. [`TemplateCache::instantiate`] always
//! returns a fresh clone: assembly splices page content into the document in
//! place, and nothing spliced into one page may show up in the next.
//!
//! # Scope
//!
//! A cache lives inside one [`CompilationContext`](crate::target::CompilationContext)
//! and dies with it. Nothing is persisted between builds.
//!
//! A template that fails to load is remembered too: later pages naming it get
//! [`CompileError::TemplateUnavailable`] without the file being read again.
//!
//! # Instrumentation
//!
//! [`parse_count`](TemplateCache::parse_count) and
//! [`hit_count`](TemplateCache::hit_count) report how often the parser ran and
//! how often a cached template was reused. They feed the build report.

use crate::dom::Document;
use crate::manifest::TemplateManifest;
use crate::target::CompileError;
use crate::types::ParsedTemplate;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: HashMap<String, ParsedTemplate>,
    failures: HashMap<String, String>,
    parses: usize,
    hits: usize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A private copy of the template named by `manifest`, running `parse`
    /// only if this cache has not seen that name yet. The first failure is
    /// returned as is; later requests get `TemplateUnavailable`.
    pub fn instantiate(
        &mut self,
        manifest: &Rc<TemplateManifest>,
        parse: impl FnOnce(&TemplateManifest) -> Result<Document, CompileError>,
    ) -> Result<ParsedTemplate, CompileError> {
        if let Some(cached) = self.entries.get(&manifest.name) {
            self.hits += 1;
            tracing::debug!(template = %manifest.name, "template cache hit");
            return Ok(cached.clone());
        }

        if let Some(reason) = self.failures.get(&manifest.name) {
            return Err(CompileError::TemplateUnavailable {
                template: manifest.name.clone(),
                reason: reason.clone(),
            });
        }

        self.parses += 1;
        tracing::debug!(template = %manifest.name, file = %manifest.file.display(), "parsing template");
        let document = match parse(manifest) {
            Ok(document) => document,
            Err(error) => {
                self.failures.insert(manifest.name.clone(), error.to_string());
                return Err(error);
            }
        };
        let parsed = ParsedTemplate {
            manifest: Rc::clone(manifest),
            document,
        };
        self.entries.insert(manifest.name.clone(), parsed.clone());
        Ok(parsed)
    }

    /// Number of times a template was actually parsed.
    pub fn parse_count(&self) -> usize {
        self.parses
    }

    /// Number of instantiations served from the cache.
    pub fn hit_count(&self) -> usize {
        self.hits
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
