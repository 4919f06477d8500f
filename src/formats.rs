//! Source format adapters, dispatched by file extension.
//!
//! A page adapter turns a content file into a [`Fragment`]; a template adapter
//! turns one into a full [`Document`]. Adapters are collected into a
//! [`FormatRegistry`] per kind. Lookup normalises the extension (lowercase,
//! leading dot stripped), an unregistered extension is
//! [`FormatError::Unsupported`], and registering two adapters for the same
//! extension fails when the registry is built.
//!
//! | Kind | Adapter | Extensions |
//! |------|---------|------------|
//! | page | [`HtmlPage`] | `html`, `htm` |
//! | page | [`MarkdownPage`] | `md`, `markdown` |
//! | template | [`HtmlTemplate`] | `html`, `htm` |

use crate::dom::{self, Document, Fragment, ParseError};
use crate::naming;
use pulldown_cmark::{Event, Options, Parser, html as md_html};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported format: no adapter for extension \"{ext}\"")]
    Unsupported { ext: String },
    #[error("extension \"{ext}\" is claimed by both {first} and {second}")]
    DuplicateExtension {
        ext: String,
        first: &'static str,
        second: &'static str,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub trait Format {
    fn name(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
}

pub trait PageFormat: Format {
    fn parse_page(&self, source: &str) -> Result<Fragment, FormatError>;
}

pub trait TemplateFormat: Format {
    fn parse_template(&self, source: &str) -> Result<Document, FormatError>;
}

/// Extension → adapter table for one kind of adapter.
pub struct FormatRegistry<F: ?Sized> {
    by_ext: BTreeMap<String, Rc<F>>,
}

impl<F: ?Sized + Format> FormatRegistry<F> {
    pub fn new(formats: impl IntoIterator<Item = Rc<F>>) -> Result<Self, FormatError> {
        let mut by_ext: BTreeMap<String, Rc<F>> = BTreeMap::new();
        for format in formats {
            for ext in format.extensions() {
                let ext = naming::normalize_extension(ext);
                if let Some(existing) = by_ext.get(&ext) {
                    return Err(FormatError::DuplicateExtension {
                        ext,
                        first: existing.name(),
                        second: format.name(),
                    });
                }
                by_ext.insert(ext, Rc::clone(&format));
            }
        }
        Ok(Self { by_ext })
    }

    pub fn lookup(&self, ext: &str) -> Result<Rc<F>, FormatError> {
        let ext = naming::normalize_extension(ext);
        self.by_ext
            .get(&ext)
            .cloned()
            .ok_or(FormatError::Unsupported { ext })
    }

    pub fn for_path(&self, path: &Path) -> Result<Rc<F>, FormatError> {
        self.lookup(&naming::extension_of(path).unwrap_or_default())
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_ext.keys().map(String::as_str)
    }
}

/// The page and template registries used by a build.
pub struct Formats {
    pub pages: FormatRegistry<dyn PageFormat>,
    pub templates: FormatRegistry<dyn TemplateFormat>,
}

impl Formats {
    pub fn standard() -> Result<Self, FormatError> {
        Ok(Self {
            pages: FormatRegistry::new([
                Rc::new(HtmlPage) as Rc<dyn PageFormat>,
                Rc::new(MarkdownPage),
            ])?,
            templates: FormatRegistry::new([Rc::new(HtmlTemplate) as Rc<dyn TemplateFormat>])?,
        })
    }
}

pub struct HtmlPage;

impl Format for HtmlPage {
    fn name(&self) -> &'static str {
        "html page"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["html", "htm"]
    }
}

impl PageFormat for HtmlPage {
    fn parse_page(&self, source: &str) -> Result<Fragment, FormatError> {
        Ok(dom::parse_fragment(source)?)
    }
}

/// CommonMark with tables and strikethrough. Single line breaks inside a
/// paragraph are kept as `<br>`.
pub struct MarkdownPage;

impl MarkdownPage {
    pub fn render_html(source: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let events = Parser::new_ext(source, options).map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        });
        let mut html = String::new();
        md_html::push_html(&mut html, events);
        html
    }
}

impl Format for MarkdownPage {
    fn name(&self) -> &'static str {
        "markdown page"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["md", "markdown"]
    }
}

impl PageFormat for MarkdownPage {
    fn parse_page(&self, source: &str) -> Result<Fragment, FormatError> {
        Ok(dom::parse_fragment(&Self::render_html(source))?)
    }
}

pub struct HtmlTemplate;

impl Format for HtmlTemplate {
    fn name(&self) -> &'static str {
        "html template"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["html", "htm"]
    }
}

impl TemplateFormat for HtmlTemplate {
    fn parse_template(&self, source: &str) -> Result<Document, FormatError> {
        Ok(dom::parse_document(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Node;

    #[test]
    fn lookup_is_case_insensitive_and_dot_tolerant() {
        let formats = Formats::standard().unwrap();
        assert_eq!(formats.pages.lookup(".MD").unwrap().name(), "markdown page");
        assert_eq!(formats.pages.lookup("Html").unwrap().name(), "html page");
        assert_eq!(
            formats.templates.lookup("htm").unwrap().name(),
            "html template"
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let formats = Formats::standard().unwrap();
        let err = formats.pages.lookup("rst").err().unwrap();
        assert_eq!(err, FormatError::Unsupported { ext: "rst".into() });
    }

    #[test]
    fn path_without_extension_is_unsupported() {
        let formats = Formats::standard().unwrap();
        assert!(formats.pages.for_path(Path::new("pages/README")).is_err());
    }

    #[test]
    fn duplicate_extension_rejected_at_construction() {
        let result =
            FormatRegistry::new([Rc::new(HtmlPage) as Rc<dyn PageFormat>, Rc::new(HtmlPage)]);
        match result {
            Err(FormatError::DuplicateExtension { ext, .. }) => assert_eq!(ext, "html"),
            _ => panic!("expected duplicate extension error"),
        }
    }

    #[test]
    fn markdown_soft_breaks_become_line_breaks() {
        let html = MarkdownPage::render_html("one\ntwo");
        assert!(html.contains("<br />"), "got: {html}");
    }

    #[test]
    fn markdown_page_parses_to_nodes() {
        let nodes = MarkdownPage.parse_page("# Title\n\nBody & more").unwrap();
        let elements: Vec<&str> = nodes
            .iter()
            .filter_map(Node::as_element)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(elements, vec!["h1", "p"]);
        assert_eq!(
            nodes[2].as_element().unwrap().text_content(),
            "Body & more"
        );
    }

    #[test]
    fn html_template_keeps_doctype() {
        let doc = HtmlTemplate
            .parse_template("<!DOCTYPE html><html><body></body></html>")
            .unwrap();
        assert_eq!(doc.doctype.as_deref(), Some("html"));
    }
}
