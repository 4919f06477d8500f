//! Page assembly: merging page content into a template and expanding macros.
//!
//! ## Content payload
//!
//! The page body is reduced to a single node before it is placed. Whitespace-only
//! text between top-level nodes does not count.
//!
//! | Significant top-level nodes | Payload |
//! |-----------------------------|---------|
//! | none | an empty `<div id="wobsite-page-content">` |
//! | one | that node, unwrapped |
//! | several | all of them, in order, inside `<div id="wobsite-page-content">` |
//!
//! ## Placeholder substitution
//!
//! The first `<wobsite-page-placeholder>` in document order is replaced by the
//! payload, keeping its position among its siblings. A placeholder at the top
//! level of the template means the template contributes nothing else: the
//! output document is the payload alone, without doctype. A template with no
//! placeholder is used unchanged and the content is dropped ([`Placement::Missing`]).
//!
//! A page without a template is emitted as its parsed body, untouched.
//!
//! ## Macro expansion
//!
//! Runs on the assembled document. Every `<wobsite-macro key="...">` is
//! replaced by the text its key resolves to in the active [`MacroScope`]. The
//! text joins the text run it lands in: appended to the text before the
//! marker, or becoming the leading text of the parent when nothing precedes
//! it. A marker without `key` resolves the sentinel `MACRO_ERR` so the mistake
//! stays visible in the output.

use crate::dom::{Document, Element, Fragment, Node};
use crate::macros::MacroScope;

pub const PLACEHOLDER_TAG: &str = "wobsite-page-placeholder";
pub const MACRO_TAG: &str = "wobsite-macro";
pub const MACRO_KEY_ATTR: &str = "key";
pub const MISSING_KEY_SENTINEL: &str = "MACRO_ERR";
pub const CONTENT_WRAPPER_ID: &str = "wobsite-page-content";

/// Where the page content ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// No template: the page body is the document.
    Templateless,
    /// Spliced in at the placeholder's position.
    Inserted,
    /// The placeholder was top-level; the payload replaced the whole template.
    Root,
    /// The template has no placeholder; content was not inserted.
    Missing,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub placement: Placement,
}

pub fn content_wrapper(children: Vec<Node>) -> Element {
    Element::new("div")
        .with_attr("id", CONTENT_WRAPPER_ID)
        .with_children(children)
}

/// Reduce a page body to the single node placed into the template.
pub fn content_payload(content: Fragment) -> Node {
    let significant = content.iter().filter(|n| !n.is_blank()).count();
    match significant {
        0 => content_wrapper(Vec::new()).into(),
        1 => content
            .into_iter()
            .find(|n| !n.is_blank())
            .unwrap_or_else(|| content_wrapper(Vec::new()).into()),
        _ => content_wrapper(content).into(),
    }
}

/// Put `payload` where the template's placeholder is.
pub fn substitute(mut template: Document, payload: Node) -> Assembly {
    let Some(path) = template.find_path(|e| e.is(PLACEHOLDER_TAG)) else {
        return Assembly {
            document: template,
            placement: Placement::Missing,
        };
    };

    if path.len() == 1 {
        return Assembly {
            document: Document::from_nodes(vec![payload]),
            placement: Placement::Root,
        };
    }

    let index = path[path.len() - 1];
    if let Some(slot) = template
        .siblings_mut(&path)
        .and_then(|siblings| siblings.get_mut(index))
    {
        *slot = payload;
    }
    Assembly {
        document: template,
        placement: Placement::Inserted,
    }
}

/// Build the output document for a page body and its optional template.
pub fn assemble(content: Fragment, template: Option<Document>) -> Assembly {
    match template {
        None => Assembly {
            document: Document::from_nodes(content),
            placement: Placement::Templateless,
        },
        Some(template) => substitute(template, content_payload(content)),
    }
}

/// What macro expansion ran into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroReport {
    pub expanded: usize,
    /// Keys no scope defines, in document order.
    pub unknown: Vec<String>,
    /// Markers without a `key` attribute.
    pub missing_keys: usize,
}

/// Replace every macro marker in `document` with its resolved text.
pub fn expand_macros(document: &mut Document, scope: &MacroScope) -> MacroReport {
    let mut report = MacroReport::default();
    expand_in(&mut document.nodes, scope, &mut report);
    report
}

fn expand_in(nodes: &mut Vec<Node>, scope: &MacroScope, report: &mut MacroReport) {
    for node in std::mem::take(nodes) {
        match node {
            Node::Element(marker) if marker.is(MACRO_TAG) => {
                let key = match marker.attr(MACRO_KEY_ATTR) {
                    Some(key) => {
                        if scope.get(key).is_none() {
                            report.unknown.push(key.to_string());
                        }
                        key
                    }
                    None => {
                        report.missing_keys += 1;
                        MISSING_KEY_SENTINEL
                    }
                };
                report.expanded += 1;
                push_text(nodes, scope.resolve(key));
            }
            Node::Element(mut element) => {
                expand_in(&mut element.children, scope, report);
                nodes.push(Node::Element(element));
            }
            Node::Text(text) => push_text(nodes, &text),
            other => nodes.push(other),
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else if !text.is_empty() {
        nodes.push(Node::text(text));
    }
}
