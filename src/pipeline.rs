//! Concrete compilation steps and the per-page graph.
//!
//! Each page of a site compiles through the same graph:
//!
//! ```text
//! ValueLeaf(page manifest)
//!   └─ Step(SelectPageFormat) ─► Exec ─► ParsedPage ─────────────┐
//!                                   │                            │
//!                                   └─ Step(SelectTemplate) ─► Exec ─► ParsedTemplate
//!                                                                │
//! JoinIf(page names a template) ◄────────────────────────────────┘
//!   └─ Step(AssemblePage) ─► Step(ExpandMacros) ─► Step(WriteArtifact)
//! ```
//!
//! Format selection happens while the graph runs: [`SelectPageFormat`] and
//! [`SelectTemplate`] look at the file extension and return the target that
//! parses the file, which [`Exec`] then resolves. The template branch sits
//! behind [`JoinIf`], so a templateless page never looks up, reads or parses a
//! template.

use crate::assemble::{self, Placement};
use crate::formats::{PageFormat, TemplateFormat};
use crate::macros::MacroScope;
use crate::manifest::{PageManifest, TemplateManifest};
use crate::naming;
use crate::target::{
    CompilationContext, CompileError, Exec, JoinIf, RootRef, Step, TargetRef, Transform, ValueLeaf,
};
use crate::types::{Diagnostic, OutputPage, ParsedPage, ParsedTemplate};
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

/// Picks the page adapter for the manifest's content file.
pub struct SelectPageFormat;

impl Transform for SelectPageFormat {
    type Input = Rc<PageManifest>;
    type Output = TargetRef<ParsedPage>;

    fn apply(
        &self,
        manifest: Rc<PageManifest>,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<TargetRef<ParsedPage>, CompileError> {
        let format = ctx
            .formats
            .pages
            .for_path(&manifest.file)
            .map_err(|source| CompileError::Format {
                path: manifest.file.clone(),
                source,
            })?;
        Ok(Step::new(ValueLeaf::new(manifest), ParsePage { format }))
    }
}

pub struct ParsePage {
    format: Rc<dyn PageFormat>,
}

impl Transform for ParsePage {
    type Input = Rc<PageManifest>;
    type Output = ParsedPage;

    fn apply(
        &self,
        manifest: Rc<PageManifest>,
        _ctx: &mut CompilationContext<'_>,
    ) -> Result<ParsedPage, CompileError> {
        tracing::debug!(page = %manifest.file.display(), format = self.format.name(), "parsing page");
        let source = fs::read_to_string(&manifest.file).map_err(CompileError::io(&manifest.file))?;
        let content = self
            .format
            .parse_page(&source)
            .map_err(|source| CompileError::Format {
                path: manifest.file.clone(),
                source,
            })?;
        Ok(ParsedPage { manifest, content })
    }
}

/// Resolves the page's template reference and picks the template adapter.
///
/// Reached only for pages that name a template; a templateless page arriving
/// here means the graph was wired wrong.
pub struct SelectTemplate;

impl Transform for SelectTemplate {
    type Input = ParsedPage;
    type Output = TargetRef<ParsedTemplate>;

    fn apply(
        &self,
        page: ParsedPage,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<TargetRef<ParsedTemplate>, CompileError> {
        let Some(name) = page.manifest.template.as_deref() else {
            return Err(CompileError::Wiring(format!(
                "template selected for templateless page {}",
                page.manifest.path.display()
            )));
        };
        let template = ctx
            .site
            .template(name)
            .cloned()
            .ok_or_else(|| CompileError::TemplateNotFound {
                page: page.manifest.path.clone(),
                template: name.to_string(),
            })?;
        let format = ctx
            .formats
            .templates
            .for_path(&template.file)
            .map_err(|source| CompileError::Format {
                path: template.file.clone(),
                source,
            })?;
        Ok(Step::new(
            ValueLeaf::new(template),
            InstantiateTemplate { format },
        ))
    }
}

/// Hands out a private copy of the template, parsing it on first use.
pub struct InstantiateTemplate {
    format: Rc<dyn TemplateFormat>,
}

impl Transform for InstantiateTemplate {
    type Input = Rc<TemplateManifest>;
    type Output = ParsedTemplate;

    fn apply(
        &self,
        manifest: Rc<TemplateManifest>,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<ParsedTemplate, CompileError> {
        let format = Rc::clone(&self.format);
        ctx.templates.instantiate(&manifest, |m| {
            let source = fs::read_to_string(&m.file).map_err(CompileError::io(&m.file))?;
            format
                .parse_template(&source)
                .map_err(|source| CompileError::Format {
                    path: m.file.clone(),
                    source,
                })
        })
    }
}

pub struct AssemblePage;

impl Transform for AssemblePage {
    type Input = (ParsedPage, Option<ParsedTemplate>);
    type Output = OutputPage;

    fn apply(
        &self,
        (page, template): (ParsedPage, Option<ParsedTemplate>),
        ctx: &mut CompilationContext<'_>,
    ) -> Result<OutputPage, CompileError> {
        let (template_manifest, template_doc) = match template {
            Some(t) => (Some(t.manifest), Some(t.document)),
            None => (None, None),
        };
        let assembly = assemble::assemble(page.content, template_doc);
        if assembly.placement == Placement::Missing {
            ctx.warn(Diagnostic::MissingPlaceholder {
                template: template_manifest
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_default(),
                page: page.manifest.path.clone(),
            });
        }
        tracing::debug!(page = %page.manifest.path.display(), placement = ?assembly.placement, "assembled page");
        Ok(OutputPage {
            page: page.manifest,
            template: template_manifest,
            document: assembly.document,
        })
    }
}

/// Expands macro markers with the site → template → page scope chain.
pub struct ExpandMacros;

impl ExpandMacros {
    pub fn scope_for(ctx: &CompilationContext<'_>, page: &OutputPage) -> MacroScope {
        let scope = ctx.site_scope();
        let scope = match &page.template {
            Some(template) => scope.push(template.macros.values.clone()),
            None => scope,
        };
        scope.push(page.page.macros.values.clone())
    }
}

impl Transform for ExpandMacros {
    type Input = OutputPage;
    type Output = OutputPage;

    fn apply(
        &self,
        mut page: OutputPage,
        ctx: &mut CompilationContext<'_>,
    ) -> Result<OutputPage, CompileError> {
        let scope = Self::scope_for(ctx, &page);
        let report = assemble::expand_macros(&mut page.document, &scope);
        for key in report.unknown {
            ctx.warn(Diagnostic::UnknownMacro {
                key,
                page: page.page.path.clone(),
            });
        }
        for _ in 0..report.missing_keys {
            ctx.warn(Diagnostic::MissingMacroKey {
                page: page.page.path.clone(),
            });
        }
        Ok(page)
    }
}

/// Serialises the page into the output directory.
pub struct WriteArtifact;

impl WriteArtifact {
    pub fn artifact_path(ctx: &CompilationContext<'_>, page: &PageManifest) -> PathBuf {
        let name = naming::artifact_file_name(&page.output, &ctx.site.config.output_extension);
        ctx.output_dir().join(name)
    }
}

impl Transform for WriteArtifact {
    type Input = OutputPage;
    type Output = ();

    fn apply(&self, page: OutputPage, ctx: &mut CompilationContext<'_>) -> Result<(), CompileError> {
        let path = Self::artifact_path(ctx, &page.page);
        if path.exists() {
            ctx.warn(Diagnostic::ArtifactOverwritten { path: path.clone() });
            fs::remove_file(&path).map_err(CompileError::io(&path))?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(CompileError::io(parent))?;
        }
        fs::write(&path, page.document.to_html()).map_err(CompileError::io(&path))?;
        tracing::info!(page = %page.page.path.display(), artifact = %path.display(), "wrote page");
        ctx.record_artifact(path);
        Ok(())
    }
}

/// The graph producing a page's finished document, without writing it.
pub fn page_document(manifest: Rc<PageManifest>) -> TargetRef<OutputPage> {
    let leaf: TargetRef<Rc<PageManifest>> = ValueLeaf::new(manifest);
    let page: TargetRef<ParsedPage> = Exec::new(Step::new(leaf, SelectPageFormat));
    let template: TargetRef<ParsedTemplate> =
        Exec::new(Step::new(Rc::clone(&page), SelectTemplate));
    let joined = JoinIf::new(page, template, |p: &ParsedPage| {
        p.manifest.template.is_some()
    });
    Step::new(Step::new(joined, AssemblePage), ExpandMacros)
}

/// The root target that compiles and writes one page.
pub fn page_graph(manifest: Rc<PageManifest>) -> RootRef {
    Step::new(page_document(manifest), WriteArtifact)
}
