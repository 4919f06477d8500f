//! In-memory element trees for page fragments and template documents.
//!
//! The tree is deliberately small: elements, text and comments. Text is
//! stored decoded and escaped again on output, except inside raw-text elements
//! (`script`, `style`) whose bodies are kept byte for byte.
//!
//! ## Parsing
//!
//! [`parse_fragment`] and [`parse_document`] drive a `quick-xml` reader with
//! every well-formedness check turned off and build the tree themselves:
//!
//! - void elements (`<br>`, `<meta ...>`) never take children, with or without `/>`
//! - an end tag closes the nearest open element of that name and everything
//!   opened after it; an end tag nothing matches is ignored
//! - elements still open at end of input are closed
//! - entity and character references are decoded (HTML5 entity table)
//! - the body of a `script` or `style` element runs to the next matching end
//!   tag and is never tokenized, so `if (a < b)` survives intact
//!
//! Everything else still has to be tag-balanced in the XML sense.
//!
//! ## Addressing
//!
//! A [`NodePath`] is the list of child indices from the top of a
//! [`Document`] down to a node. A path of length one is a top-level node,
//! which has no parent element.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("markup parse error at byte {position}: {message}")]
pub struct ParseError {
    pub position: u64,
    pub message: String,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Text nodes holding only whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((key.to_string(), value.to_string())),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(&e.children, out),
            Node::Comment(_) => {}
        }
    }
}

/// An ordered sequence of top-level nodes: the body of a page.
pub type Fragment = Vec<Node>;

/// Child indices from the document top down to a node.
pub type NodePath = Vec<usize>;

/// A complete document: optional doctype plus top-level nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub doctype: Option<String>,
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            doctype: None,
            nodes,
        }
    }

    /// Path of the first element, in document order, accepted by `pred`.
    pub fn find_path(&self, pred: impl Fn(&Element) -> bool) -> Option<NodePath> {
        let mut path = Vec::new();
        find_in(&self.nodes, &pred, &mut path).then_some(path)
    }

    /// First element named `name`, in document order.
    pub fn find_element(&self, name: &str) -> Option<&Element> {
        let path = self.find_path(|e| e.is(name))?;
        self.node_at(&path).and_then(Node::as_element)
    }

    /// Number of elements named `name` anywhere in the document.
    pub fn count_elements(&self, name: &str) -> usize {
        fn count(nodes: &[Node], name: &str) -> usize {
            nodes
                .iter()
                .filter_map(Node::as_element)
                .map(|e| usize::from(e.is(name)) + count(&e.children, name))
                .sum()
        }
        count(&self.nodes, name)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (last, parents) = path.split_last()?;
        let mut nodes = &self.nodes;
        for &i in parents {
            nodes = &nodes.get(i)?.as_element()?.children;
        }
        nodes.get(*last)
    }

    /// Child list holding the node at `path`: the element children of its
    /// parent, or the top-level list for a path of length one.
    pub fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let (_, parents) = path.split_last()?;
        let mut nodes = &mut self.nodes;
        for &i in parents {
            nodes = match nodes.get_mut(i)? {
                Node::Element(e) => &mut e.children,
                _ => return None,
            };
        }
        Some(nodes)
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

fn find_in(nodes: &[Node], pred: &impl Fn(&Element) -> bool, path: &mut NodePath) -> bool {
    for (i, node) in nodes.iter().enumerate() {
        if let Node::Element(e) = node {
            path.push(i);
            if pred(e) || find_in(&e.children, pred, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

// ============================================================================
// Serialization
// ============================================================================

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(doctype) = &self.doctype {
            write!(f, "<!DOCTYPE {doctype}>")?;
        }
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => write!(f, "{e}"),
            Node::Text(t) => f.write_str(&partial_escape(t.as_str())),
            Node::Comment(c) => write!(f, "<!--{c}-->"),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attrs {
            write!(f, " {}=\"{}\"", key, escape(value.as_str()))?;
        }
        f.write_str(">")?;
        if is_void(&self.name) && self.children.is_empty() {
            return Ok(());
        }
        let raw = is_raw_text(&self.name);
        for child in &self.children {
            match child {
                Node::Text(t) if raw => f.write_str(t)?,
                other => write!(f, "{other}")?,
            }
        }
        write!(f, "</{}>", self.name)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a page body into its top-level nodes.
pub fn parse_fragment(source: &str) -> Result<Fragment, ParseError> {
    Ok(parse(source)?.nodes)
}

/// Parse a full document, keeping its doctype.
pub fn parse_document(source: &str) -> Result<Document, ParseError> {
    parse(source)
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<Element>,
    doc: Document,
}

impl TreeBuilder {
    fn append(&mut self, node: Node) {
        let nodes = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.doc.nodes,
        };
        if let (Node::Text(new), Some(Node::Text(prev))) = (&node, nodes.last_mut()) {
            prev.push_str(new);
            return;
        }
        nodes.push(node);
    }

    fn open(&mut self, element: Element) {
        if is_void(&element.name) {
            self.append(Node::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn close(&mut self, name: &str) {
        let Some(pos) = self.open.iter().rposition(|e| e.is(name)) else {
            return;
        };
        while self.open.len() > pos {
            if let Some(element) = self.open.pop() {
                self.append(Node::Element(element));
            }
        }
    }

    fn finish(mut self) -> Document {
        self.close_all();
        self.doc
    }

    fn close_all(&mut self) {
        while let Some(element) = self.open.pop() {
            self.append(Node::Element(element));
        }
    }
}

fn reader_for(source: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(source);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    reader
}

/// The body of a raw-text element opened just before `start`, and the offset
/// just past its end tag. An unterminated body runs to the end of `source`.
fn raw_text_body<'s>(source: &'s str, start: usize, name: &str) -> (&'s str, usize) {
    let rest = &source[start..];
    let lower = rest.to_ascii_lowercase();
    let Some(end) = lower.find(&format!("</{name}")) else {
        return (rest, source.len());
    };
    let resume = lower[end..]
        .find('>')
        .map_or(source.len(), |gt| start + end + gt + 1);
    (&rest[..end], resume)
}

fn parse(source: &str) -> Result<Document, ParseError> {
    let mut builder = TreeBuilder::default();
    // Raw-text bodies are cut out of the source, so the reader restarts after
    // each one at `offset`.
    let mut offset = 0;
    'segments: loop {
        let mut reader = reader_for(&source[offset..]);
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = element_from(&e);
                    if !is_raw_text(&element.name) {
                        builder.open(element);
                        continue;
                    }
                    let name = element.name.clone();
                    let body_start = offset + reader.buffer_position() as usize;
                    let (body, resume) = raw_text_body(source, body_start, &name);
                    builder.open(element);
                    if !body.is_empty() {
                        builder.append(Node::Text(body.to_string()));
                    }
                    builder.close(&name);
                    offset = resume;
                    continue 'segments;
                }
                Ok(Event::Empty(e)) => builder.append(Node::Element(element_from(&e))),
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    builder.close(&name);
                }
                Ok(Event::Text(t)) => {
                    builder.append(Node::Text(decode(&String::from_utf8_lossy(&t))));
                }
                Ok(Event::CData(c)) => {
                    builder.append(Node::Text(String::from_utf8_lossy(&c).into_owned()));
                }
                Ok(Event::Comment(c)) => {
                    builder.append(Node::Comment(String::from_utf8_lossy(&c).into_owned()));
                }
                Ok(Event::DocType(d)) => {
                    builder.doc.doctype = Some(String::from_utf8_lossy(&d).trim().to_string());
                }
                Ok(Event::Eof) => break 'segments,
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError {
                        position: offset as u64 + reader.error_position() as u64,
                        message: e.to_string(),
                    });
                }
            }
        }
    }
    Ok(builder.finish())
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut element = Element::new(&name);
    for attr in start.html_attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = decode(&String::from_utf8_lossy(&attr.value));
        element.attrs.push((key, value));
    }
    element
}

/// Decode entity and character references; malformed input is kept verbatim.
fn decode(raw: &str) -> String {
    unescape_with(raw, resolve_html5_entity)
        .map(|text| text.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
