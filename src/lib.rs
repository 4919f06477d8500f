//! # Wobsite
//!
//! A small static site generator. A site is a directory of TOML manifests:
//! one `wobsite.toml` for the site, one `*.template.toml` per HTML template and
//! one `*.page.toml` per page. Each page body (HTML or Markdown) is merged into
//! its template, macros are expanded, and the result is written to the output
//! directory.
//!
//! # Architecture: Scan, Compile, Write
//!
//! ```text
//! 1. Scan      wobsite.toml  →  Site          (manifests, validated directories)
//! 2. Compile   Site          →  page graphs   (parse → assemble → expand macros)
//! 3. Write     page graphs   →  output/       (artifacts + copied assets)
//! ```
//!
//! Scanning never compiles and compiling never scans: a site with a duplicate
//! template name or a missing directory fails before a single page is parsed,
//! and the output directory is left untouched.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Loads `wobsite.toml`, validates directories, discovers manifests, detects duplicate templates |
//! | [`generate`] | Cleans the output directory, runs every page graph, applies the failure policy, copies assets |
//! | [`pipeline`] | The concrete compilation steps and the per-page graph |
//! | [`target`] | The generic compilation graph: node kinds, memoisation, `CompilationContext` |
//! | [`assemble`] | Content normalisation, placeholder substitution, macro expansion |
//! | [`cache`] | Parse-once-per-build template cache handing out private copies |
//! | [`macros`] | Persistent site → template → page macro scope chain |
//! | [`dom`] | Element tree, lenient HTML parser, HTML serialiser |
//! | [`formats`] | Page and template format adapters, dispatched by extension |
//! | [`manifest`] | Typed site, template and page manifest records |
//! | [`keys`] | Path-addressed required/optional/defaulted lookup into TOML |
//! | [`config`] | The `[compile]` table and the stock `wobsite.toml` |
//! | [`naming`] | File-name conventions: extensions, manifest suffixes, artifact names |
//! | [`types`] | Values passed between compilation steps, and diagnostics |
//! | [`output`] | CLI output formatting for `check` and `build` |
//!
//! # Design Decisions
//!
//! ## A Typed Graph Instead of a Fixed Loop
//!
//! Every page compiles through a graph of [`target::Target`] nodes. Each node
//! declares its output type, so parse, assemble and write steps compose without
//! a central function knowing their order. Format choice happens inside the
//! graph ([`target::Exec`]), and the template branch only runs for pages that
//! name a template ([`target::JoinIf`]).
//!
//! ## Parse Each Template Once
//!
//! All pages of a build share one [`target::CompilationContext`], which owns the
//! [`cache::TemplateCache`]. A template is read and parsed the first time a page
//! needs it; every page receives its own clone to splice content into.
//!
//! ## Macros as a Scope Chain
//!
//! Macro scopes are an immutable linked chain ([`macros::MacroScope`]): site,
//! then template, then page. Adding a scope builds a new chain, so there is no
//! push/pop pairing to keep balanced and the site scope is never mutated.
//!
//! ## Degrade, Don't Abort, on Authoring Mistakes
//!
//! A template without a placeholder, a macro key nobody defines, or a marker
//! without a key all produce output with a visible fallback plus a
//! [`types::Diagnostic`]. A page naming an unknown template fails alone by
//! default (`[compile] missing_template`). Graph wiring faults abort the build.
//!
//! ## Clean Output Every Time
//!
//! The output directory is removed and recreated on every build, so artifacts
//! from different manifest sets never mix. Directories that would take sources
//! with them are refused.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod dom;
pub mod formats;
pub mod generate;
pub mod keys;
pub mod macros;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod target;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
