//! Matcher primitives.
//!
//! [`PatternMatcher`] tests a single string (usually an attribute value),
//! [`TagMatcher`] tests a whole element. Both are pure: their answer depends
//! only on the input, never on where the interpreter currently is.
//!
//! A [`Matchable`] pairs a matcher with what it applies to, and a list of
//! matchables attached to one element spec must all hold.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Result, SiftError};
use crate::parse::Node;

pub const CLASS_ATTR: &str = "class";
pub const STYLE_ATTR: &str = "style";
pub const ID_ATTR: &str = "id";

/// A yes/no test over a single string.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Matches anything, including an absent attribute.
    Always,
    Equals(String),
    EqualsIgnoreCase(String),
    Contains(String),
    ContainsIgnoreCase(String),
    /// The regex must match the whole input. Built anchored by
    /// [`PatternMatcher::regex_match`].
    RegexMatch(Regex),
    /// The regex must match somewhere in the input.
    RegexFind(Regex),
}

impl PatternMatcher {
    pub fn always() -> Self {
        Self::Always
    }

    pub fn equals(value: impl Into<String>) -> Self {
        Self::Equals(value.into())
    }

    pub fn equals_ignore_case(value: impl Into<String>) -> Self {
        Self::EqualsIgnoreCase(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    pub fn contains_ignore_case(value: impl Into<String>) -> Self {
        Self::ContainsIgnoreCase(value.into())
    }

    /// Compiles `pattern` and matches it against the whole input.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidRegex`] if the pattern does not compile.
    pub fn regex_match(pattern: &str) -> Result<Self> {
        let anchored = format!(r"\A(?:{})\z", pattern);
        let regex = Regex::new(&anchored).map_err(|source| SiftError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::RegexMatch(regex))
    }

    /// Compiles `pattern` and looks for it anywhere in the input.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidRegex`] if the pattern does not compile.
    pub fn regex_find(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| SiftError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::RegexFind(regex))
    }

    /// Wraps an already compiled regex with find semantics.
    pub fn find(regex: Regex) -> Self {
        Self::RegexFind(regex)
    }

    /// Re-anchors an already compiled regex with whole-input semantics.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::InvalidRegex`] if the anchored form exceeds the
    /// regex size limits.
    pub fn full_match(regex: &Regex) -> Result<Self> {
        Self::regex_match(regex.as_str())
    }

    pub fn matches(&self, input: &str) -> bool {
        match self {
            Self::Always => true,
            Self::Equals(value) => input == value,
            Self::EqualsIgnoreCase(value) => input.to_lowercase() == value.to_lowercase(),
            Self::Contains(value) => input.contains(value.as_str()),
            Self::ContainsIgnoreCase(value) => input.to_lowercase().contains(&value.to_lowercase()),
            Self::RegexMatch(regex) => regex.is_match(input),
            Self::RegexFind(regex) => regex.is_match(input),
        }
    }
}

/// Predicate over a whole element for [`TagMatcher::Custom`].
pub type ElementPredicate = Arc<dyn for<'a> Fn(Node<'a>) -> bool + Send + Sync>;

/// A yes/no test over a whole element.
#[derive(Clone)]
pub enum TagMatcher {
    NoAttributes,
    AnyAttribute,
    HasAttribute(String),
    HasAnyOfAttributes(Vec<String>),
    Custom(ElementPredicate),
}

impl TagMatcher {
    pub fn no_attributes() -> Self {
        Self::NoAttributes
    }

    pub fn any_attribute() -> Self {
        Self::AnyAttribute
    }

    pub fn has_attribute(name: impl Into<String>) -> Self {
        Self::HasAttribute(name.into())
    }

    pub fn has_any_of_attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HasAnyOfAttributes(names.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(Node<'a>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// Text nodes never match a tag matcher.
    pub fn matches(&self, node: Node<'_>) -> bool {
        if !node.is_element() {
            return false;
        }

        match self {
            Self::NoAttributes => !node.has_attributes(),
            Self::AnyAttribute => node.has_attributes(),
            Self::HasAttribute(name) => node.attr(name).is_some(),
            Self::HasAnyOfAttributes(names) => names.iter().any(|name| node.attr(name).is_some()),
            Self::Custom(predicate) => predicate(node),
        }
    }
}

impl fmt::Debug for TagMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAttributes => f.write_str("NoAttributes"),
            Self::AnyAttribute => f.write_str("AnyAttribute"),
            Self::HasAttribute(name) => f.debug_tuple("HasAttribute").field(name).finish(),
            Self::HasAnyOfAttributes(names) => f.debug_tuple("HasAnyOfAttributes").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One predicate of an element spec.
#[derive(Debug, Clone)]
pub enum Matchable {
    /// Holds for every node, text nodes included.
    Any,
    /// Tests the value of attribute `key`. An absent attribute is tested as
    /// the empty string, so [`PatternMatcher::Always`] still holds.
    Attr { key: String, matcher: PatternMatcher },
    Tag(TagMatcher),
}

impl Matchable {
    pub fn matches(&self, node: Node<'_>) -> bool {
        match self {
            Self::Any => true,
            Self::Attr { key, matcher } => matcher.matches(node.attr(key).unwrap_or_default()),
            Self::Tag(matcher) => matcher.matches(node),
        }
    }
}

/// True when every matchable holds for `node`.
pub fn match_all(matchables: &[Matchable], node: Node<'_>) -> bool {
    matchables.iter().all(|matchable| matchable.matches(node))
}

/// Collects the matchables of one element spec or predicate.
///
/// # Example
///
/// ```rust
/// use sift_core::{MatchableBuilder, PatternMatcher, TagMatcher};
///
/// let matchables = MatchableBuilder::new()
///     .class_name(PatternMatcher::equals("thread_image_box"))
///     .tag(TagMatcher::has_attribute("data-id"))
///     .build();
/// assert_eq!(matchables.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MatchableBuilder {
    matchables: Vec<Matchable>,
}

impl MatchableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts any element; the tag name alone decides.
    pub fn any_tag(mut self) -> Self {
        self.matchables.push(Matchable::Any);
        self
    }

    pub fn attr(mut self, key: impl Into<String>, matcher: PatternMatcher) -> Self {
        self.matchables.push(Matchable::Attr { key: key.into(), matcher });
        self
    }

    pub fn id(self, matcher: PatternMatcher) -> Self {
        self.attr(ID_ATTR, matcher)
    }

    pub fn class_name(self, matcher: PatternMatcher) -> Self {
        self.attr(CLASS_ATTR, matcher)
    }

    pub fn style(self, matcher: PatternMatcher) -> Self {
        self.attr(STYLE_ATTR, matcher)
    }

    pub fn tag(mut self, matcher: TagMatcher) -> Self {
        self.matchables.push(Matchable::Tag(matcher));
        self
    }

    pub fn build(self) -> Vec<Matchable> {
        self.matchables
    }
}
