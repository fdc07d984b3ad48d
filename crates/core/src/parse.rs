//! HTML parsing and the read-only node view the engine walks.
//!
//! Parsing itself is delegated to `scraper` (html5ever). This module wraps
//! the resulting tree in two small types: [`Document`], which owns the parsed
//! tree, and [`Node`], a `Copy` handle to one element or text node inside it.
//! The interpreter never mutates the tree.
//!
//! # Example
//!
//! ```rust
//! use sift_core::parse::Document;
//!
//! let doc = Document::parse_fragment(r#"<p class="lead">Hello</p><p>World</p>"#);
//! let nodes = doc.root_nodes();
//!
//! assert_eq!(nodes.len(), 2);
//! assert_eq!(nodes[0].tag_name(), Some("p"));
//! assert_eq!(nodes[0].attr("class"), Some("lead"));
//! ```

use ego_tree::NodeRef;
use scraper::{ElementRef, Html};

/// Represents a parsed HTML document.
///
/// A Document can be built from a complete page (`<html>`, `<head>` and
/// `<body>` are synthesized by the parser when missing) or from a fragment,
/// in which case the top-level nodes are exactly the nodes of the fragment.
pub struct Document {
    html: Html,
    fragment: bool,
}

impl Document {
    /// Parses a complete HTML page.
    ///
    /// The top-level node list of the result is the document's children, which
    /// in practice is the single `<html>` element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sift_core::parse::Document;
    ///
    /// let doc = Document::parse("<body><div id=\"a\"></div></body>");
    /// let roots = doc.root_nodes();
    /// assert_eq!(roots[0].tag_name(), Some("html"));
    /// ```
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), fragment: false }
    }

    /// Parses an HTML fragment.
    ///
    /// The top-level node list is the fragment's own nodes, without the
    /// wrapper element the parser inserts around them.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), fragment: true }
    }

    /// Gets the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Whether this document was parsed as a fragment.
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// Top-level nodes, with comments, doctypes and blank text removed.
    ///
    /// This is the sibling list an executor starts from.
    pub fn root_nodes(&self) -> Vec<Node<'_>> {
        if self.fragment {
            Node::new(*self.html.root_element()).children()
        } else {
            Node::new(self.html.tree.root()).children()
        }
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }
}

/// A read-only handle to a node of a parsed [`Document`].
///
/// Only elements and text nodes are ever handed out by [`Node::children`];
/// comments, doctypes and whitespace-only text are skipped so that programs
/// can be written against the visible structure of a page.
#[derive(Clone, Copy, Debug)]
pub struct Node<'a> {
    node: NodeRef<'a, scraper::Node>,
}

impl<'a> Node<'a> {
    /// Wraps a raw `ego_tree` node reference.
    pub fn new(node: NodeRef<'a, scraper::Node>) -> Self {
        Self { node }
    }

    /// The wrapped `ego_tree` node reference.
    pub fn node_ref(&self) -> NodeRef<'a, scraper::Node> {
        self.node
    }

    /// Returns an `ElementRef` when this node is an element.
    pub fn element(&self) -> Option<ElementRef<'a>> {
        ElementRef::wrap(self.node)
    }

    pub fn is_element(&self) -> bool {
        self.node.value().is_element()
    }

    pub fn is_text(&self) -> bool {
        self.node.value().is_text()
    }

    /// Whether this is a text node made only of whitespace.
    pub fn is_blank(&self) -> bool {
        self.text().is_some_and(|text| text.trim().is_empty())
    }

    /// Gets the tag name of an element (lowercase for HTML elements).
    ///
    /// Returns `None` for text nodes.
    pub fn tag_name(&self) -> Option<&'a str> {
        self.node.value().as_element().map(|element| element.name())
    }

    /// Gets the value of an attribute.
    ///
    /// Returns `None` if the attribute is not present or this is not an element.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node.value().as_element().and_then(|element| element.attr(name))
    }

    /// Whether this element carries at least one attribute.
    pub fn has_attributes(&self) -> bool {
        self.node
            .value()
            .as_element()
            .is_some_and(|element| element.attrs().next().is_some())
    }

    /// Iterates the attributes of an element in document order.
    pub fn attrs(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.node.value().as_element().into_iter().flat_map(|element| element.attrs())
    }

    /// Raw content of a text node. `None` for elements.
    pub fn text(&self) -> Option<&'a str> {
        self.node.value().as_text().map(|text| &*text.text)
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        match self.element() {
            Some(element) => element.text().collect(),
            None => self.text().unwrap_or_default().to_string(),
        }
    }

    /// Visible children: elements and non-blank text nodes, in order.
    pub fn children(&self) -> Vec<Node<'a>> {
        self.node
            .children()
            .map(Node::new)
            .filter(|child| child.is_element() || (child.is_text() && !child.is_blank()))
            .collect()
    }

    /// Serializes this node back to HTML.
    ///
    /// Elements are rendered with their own tags; text nodes are escaped.
    pub fn html(&self) -> String {
        if let Some(element) = self.element() {
            return element.html();
        }

        self.text().map(escape_text).unwrap_or_default()
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
