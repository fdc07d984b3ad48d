//! Error types for sift operations.
//!
//! This module defines the main error type [`SiftError`]. Almost every
//! variant is raised while a program is being *built*: a bad specification
//! fails fast, before any document is touched. Running a program over a
//! document never fails because an element is missing; absent structure is
//! simply skipped.
//!
//! # Example
//!
//! ```rust
//! use sift_core::{PatternMatcher, SiftError};
//!
//! match PatternMatcher::regex_find("page/(\\d+") {
//!     Err(SiftError::InvalidRegex { pattern, .. }) => assert_eq!(pattern, "page/(\\d+"),
//!     _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

/// Main error type for program construction and execution.
#[derive(Error, Debug)]
pub enum SiftError {
    /// A regex handed to a pattern matcher failed to compile.
    #[error("Invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A step was declared without any matchable.
    ///
    /// Every element spec needs at least one predicate; use
    /// [`MatchableBuilder::any_tag`](crate::MatchableBuilder::any_tag) to
    /// accept any element with the given tag name.
    #[error("Element <{tag}> was declared with an empty matchable list")]
    EmptyMatchables { tag: String },

    /// `nest` was used where no step precedes it on the same level, so there
    /// is no node whose children could be scanned.
    #[error("nest() in group {group:?} has no preceding step to descend into")]
    NestWithoutStep { group: Option<String> },

    /// The flat command list is structurally broken (unbalanced loop,
    /// condition or scope markers).
    ///
    /// Programs produced by [`CommandBuilder`](crate::CommandBuilder) are
    /// always balanced; this is reported instead of panicking.
    #[error("Malformed program: {0}")]
    MalformedProgram(String),
}

/// Result type alias for SiftError.
///
/// This is a convenience alias for `std::result::Result<T, SiftError>`.
pub type Result<T> = std::result::Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiftError::EmptyMatchables { tag: "div".to_string() };
        assert!(err.to_string().contains("<div>"));
    }

    #[test]
    fn test_nest_without_step_display() {
        let err = SiftError::NestWithoutStep { group: Some("posts".to_string()) };
        assert!(err.to_string().contains("posts"));
    }

    #[test]
    fn test_invalid_regex_keeps_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = SiftError::InvalidRegex { pattern: "(".to_string(), source };

        assert!(err.to_string().contains("Invalid regex '('"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
