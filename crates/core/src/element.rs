//! Element specs: a tag name, the matchables it must satisfy, the values to
//! extract and the callback that receives them.

use std::fmt;
use std::sync::Arc;

use crate::extract::{ExtractedValues, Extraction, extract_values};
use crate::matcher::{Matchable, match_all};
use crate::parse::Node;

/// Callback invoked with every node an element spec matches.
pub type ExtractorFn<T> = Arc<dyn for<'a> Fn(Node<'a>, &ExtractedValues, &mut T) + Send + Sync>;

/// A named tag plus the predicates and extractions attached to it.
///
/// Built once when a program is compiled and shared, read-only, by every run
/// of that program.
pub struct ElementSpec<T> {
    tag_name: String,
    matchables: Vec<Matchable>,
    extractions: Vec<Extraction>,
    extractor: Option<ExtractorFn<T>>,
}

impl<T> ElementSpec<T> {
    pub fn new(tag_name: impl Into<String>, matchables: Vec<Matchable>) -> Self {
        Self { tag_name: tag_name.into(), matchables, extractions: Vec::new(), extractor: None }
    }

    pub fn with_extractions(mut self, extractions: Vec<Extraction>) -> Self {
        self.extractions = extractions;
        self
    }

    pub fn with_extractor<F>(mut self, extractor: F) -> Self
    where
        F: for<'a> Fn(Node<'a>, &ExtractedValues, &mut T) + Send + Sync + 'static,
    {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn matchables(&self) -> &[Matchable] {
        &self.matchables
    }

    pub fn extractions(&self) -> &[Extraction] {
        &self.extractions
    }

    /// Tag name (ASCII case-insensitive) and every matchable must hold.
    pub fn matches(&self, node: Node<'_>) -> bool {
        node.tag_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(&self.tag_name))
            && match_all(&self.matchables, node)
    }

    /// Runs the extractions and hands the result to the callback, if any.
    pub fn extract(&self, node: Node<'_>, collector: &mut T) {
        let Some(extractor) = &self.extractor else {
            return;
        };

        let values = extract_values(node, &self.extractions);
        extractor(node, &values, collector);
    }
}

impl<T> fmt::Debug for ElementSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSpec")
            .field("tag_name", &self.tag_name)
            .field("matchables", &self.matchables)
            .field("extractions", &self.extractions)
            .field("has_extractor", &self.extractor.is_some())
            .finish()
    }
}
