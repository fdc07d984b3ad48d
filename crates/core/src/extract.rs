//! Extraction descriptors and the values they produce.
//!
//! An element spec lists what to pull out of the node it matches: attribute
//! values, the node's text, or the HTML of its children. None of these can
//! fail a run. A missing attribute is simply absent from [`ExtractedValues`],
//! and a text request against a node of the wrong shape is logged and
//! skipped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::parse::Node;

/// One request for data out of a matched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The value of a single attribute.
    Attr(String),
    /// The value of the first present attribute among several candidates.
    AnyAttr(Vec<String>),
    /// The text of a text node, or of an element's single text child.
    Text,
    /// The HTML of all non-blank children, joined with `\n`.
    Html,
}

/// Collects the extraction requests of one element spec.
///
/// # Example
///
/// ```rust
/// use sift_core::{Extraction, ExtractorBuilder};
///
/// let extractions = ExtractorBuilder::new().text().attr("href").build();
/// assert_eq!(extractions, vec![Extraction::Text, Extraction::Attr("href".to_string())]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    extractions: Vec<Extraction>,
}

impl ExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, key: impl Into<String>) -> Self {
        self.extractions.push(Extraction::Attr(key.into()));
        self
    }

    /// Different pages use different attributes for the same thing
    /// (`src` vs `data-src`); the first one present wins.
    pub fn any_attr<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extractions
            .push(Extraction::AnyAttr(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn text(mut self) -> Self {
        self.extractions.push(Extraction::Text);
        self
    }

    pub fn html(mut self) -> Self {
        self.extractions.push(Extraction::Html);
        self
    }

    pub fn build(self) -> Vec<Extraction> {
        self.extractions
    }
}

/// Values pulled out of one matched node.
///
/// Every accessor returns an `Option`: callers must treat each field as
/// possibly missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedValues {
    attrs: HashMap<String, String>,
    text: Option<String>,
    html: Option<String>,
}

impl ExtractedValues {
    /// Value of attribute `key`, if it was requested and present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Value of the first of `keys` that was extracted.
    pub fn any_attr<S: AsRef<str>>(&self, keys: &[S]) -> Option<&str> {
        keys.iter().find_map(|key| self.attr(key.as_ref()))
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.text.is_none() && self.html.is_none()
    }
}

/// Runs every extraction of an element spec against `node`.
pub fn extract_values(node: Node<'_>, extractions: &[Extraction]) -> ExtractedValues {
    let mut values = ExtractedValues::default();

    for extraction in extractions {
        match extraction {
            Extraction::Attr(key) => {
                if let Some(value) = node.attr(key) {
                    values.attrs.insert(key.clone(), value.to_string());
                }
            }
            Extraction::AnyAttr(keys) => {
                if let Some((key, value)) = keys.iter().find_map(|key| node.attr(key).map(|value| (key, value))) {
                    values.attrs.insert(key.clone(), value.to_string());
                }
            }
            Extraction::Text => values.text = extract_text(node),
            Extraction::Html => values.html = extract_html(node),
        }
    }

    values
}

/// Text of a text node, or of the single text child of an element.
///
/// Any other shape is logged and yields `None`.
pub fn extract_text(node: Node<'_>) -> Option<String> {
    if let Some(text) = node.text() {
        return Some(text.to_string());
    }

    let children = node.children();
    match children.as_slice() {
        [child] if child.is_text() => child.text().map(str::to_string),
        [child] => {
            tracing::warn!(
                tag = node.tag_name().unwrap_or_default(),
                child = child.tag_name().unwrap_or_default(),
                "text extraction expected a text child, found an element"
            );
            None
        }
        [] => {
            tracing::warn!(tag = node.tag_name().unwrap_or_default(), "text extraction on a node without children");
            None
        }
        _ => {
            tracing::warn!(
                tag = node.tag_name().unwrap_or_default(),
                children = children.len(),
                "text extraction expected exactly one child"
            );
            None
        }
    }
}

/// HTML of every non-blank child, one per line. `None` when nothing is left.
pub fn extract_html(node: Node<'_>) -> Option<String> {
    let children = node.children();
    if children.is_empty() {
        return None;
    }

    Some(children.iter().map(Node::html).collect::<Vec<_>>().join("\n"))
}
