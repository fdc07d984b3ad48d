//! Nested builder DSL compiling into a flat [`CommandGroup`].
//!
//! A program is written in the shape of the page it reads: `tag` says what
//! to find on the current level, `nest` goes one level down into the
//! children of the element matched just before it, `loop_while` and
//! `execute_if` repeat or guard a block on the current level.
//!
//! # Example
//!
//! ```rust
//! use sift_core::{CommandBuilder, CommandExecutor, Document, PatternMatcher};
//!
//! #[derive(Default)]
//! struct Ids(Vec<String>);
//!
//! let program = CommandBuilder::<Ids>::new()
//!     .html()
//!     .nest(|b| {
//!         b.body().nest(|b| {
//!             b.loop_while(
//!                 |m| m.class_name(PatternMatcher::equals("item")),
//!                 |b| {
//!                     b.tag_extract(
//!                         "div",
//!                         |m| m.any_tag(),
//!                         |e| e.attr("id"),
//!                         |_, values, ids: &mut Ids| ids.0.extend(values.attr("id").map(str::to_string)),
//!                     )
//!                 },
//!             )
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! let doc = Document::parse(r#"<div class="item" id="a"></div><div class="item" id="b"></div><div id="c"></div>"#);
//! let mut ids = Ids::default();
//! CommandExecutor::new().execute_commands(&doc, &program, &mut ids).unwrap();
//! assert_eq!(ids.0, vec!["a", "b"]);
//! ```

use crate::command::{Command, CommandGroup};
use crate::element::ElementSpec;
use crate::error::{Result, SiftError};
use crate::extract::{ExtractedValues, ExtractorBuilder};
use crate::matcher::{Matchable, MatchableBuilder};
use crate::parse::Node;

pub const HTML_TAG: &str = "html";
pub const HEAD_TAG: &str = "head";
pub const BODY_TAG: &str = "body";
pub const DIV_TAG: &str = "div";
pub const SPAN_TAG: &str = "span";
pub const A_TAG: &str = "a";
pub const ARTICLE_TAG: &str = "article";
pub const HEADER_TAG: &str = "header";
pub const HEADING_TAG: &str = "h";
pub const META_TAG: &str = "meta";
pub const TITLE_TAG: &str = "title";
pub const SCRIPT_TAG: &str = "script";
pub const NOSCRIPT_TAG: &str = "noscript";

/// Builder for a [`CommandGroup`].
///
/// Errors (empty matchable lists, `nest` without a preceding step) are
/// recorded as they happen and returned by [`CommandBuilder::build`]; the
/// first one wins.
pub struct CommandBuilder<T> {
    group_name: Option<String>,
    commands: Vec<Command<T>>,
    next_id: usize,
    has_step: bool,
    error: Option<SiftError>,
}

impl<T> CommandBuilder<T> {
    pub fn new() -> Self {
        Self::with_ids(None, 0)
    }

    /// A builder whose group name shows up in errors and debug output.
    pub fn named(group_name: impl Into<String>) -> Self {
        Self::with_ids(Some(group_name.into()), 0)
    }

    fn with_ids(group_name: Option<String>, next_id: usize) -> Self {
        Self { group_name, commands: Vec::new(), next_id, has_step: false, error: None }
    }

    /// Appends a step matching `<tag_name>` with all `matchables`.
    pub fn tag<M>(self, tag_name: &str, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        let matchables = matchables(MatchableBuilder::new()).build();
        self.push_step(ElementSpec::new(tag_name, matchables))
    }

    /// Appends a step that extracts values from the matched node and hands
    /// them to `extractor`.
    pub fn tag_extract<M, E, F>(self, tag_name: &str, matchables: M, extractions: E, extractor: F) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
        E: FnOnce(ExtractorBuilder) -> ExtractorBuilder,
        F: for<'a> Fn(Node<'a>, &ExtractedValues, &mut T) + Send + Sync + 'static,
    {
        let element = ElementSpec::new(tag_name, matchables(MatchableBuilder::new()).build())
            .with_extractions(extractions(ExtractorBuilder::new()).build())
            .with_extractor(extractor);
        self.push_step(element)
    }

    /// Appends a step that is only attempted when `predicate` holds for the
    /// next unconsumed node.
    pub fn tag_if<P, M, E, F>(mut self, predicate: P, tag_name: &str, matchables: M, extractions: E, extractor: F) -> Self
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
        E: FnOnce(ExtractorBuilder) -> ExtractorBuilder,
        F: for<'a> Fn(Node<'a>, &ExtractedValues, &mut T) + Send + Sync + 'static,
    {
        let predicate = self.predicate(predicate);
        let element = ElementSpec::new(tag_name, matchables(MatchableBuilder::new()).build())
            .with_extractions(extractions(ExtractorBuilder::new()).build())
            .with_extractor(extractor);

        if element.matchables().is_empty() {
            self.fail(SiftError::EmptyMatchables { tag: tag_name.to_string() });
        }

        self.commands.push(Command::ConditionalStep { predicate, element });
        self.has_step = true;
        self
    }

    pub fn html(self) -> Self {
        self.tag(HTML_TAG, MatchableBuilder::any_tag)
    }

    pub fn head(self) -> Self {
        self.tag(HEAD_TAG, MatchableBuilder::any_tag)
    }

    pub fn body(self) -> Self {
        self.tag(BODY_TAG, MatchableBuilder::any_tag)
    }

    pub fn title(self) -> Self {
        self.tag(TITLE_TAG, MatchableBuilder::any_tag)
    }

    pub fn div<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(DIV_TAG, matchables)
    }

    pub fn span<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(SPAN_TAG, matchables)
    }

    pub fn a<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(A_TAG, matchables)
    }

    pub fn article<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(ARTICLE_TAG, matchables)
    }

    pub fn header<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(HEADER_TAG, matchables)
    }

    /// `<h1>` to `<h6>`.
    pub fn heading<M>(self, level: u8, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(&format!("{HEADING_TAG}{level}"), matchables)
    }

    pub fn meta<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(META_TAG, matchables)
    }

    pub fn script<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(SCRIPT_TAG, matchables)
    }

    pub fn noscript<M>(self, matchables: M) -> Self
    where
        M: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        self.tag(NOSCRIPT_TAG, matchables)
    }

    /// Runs `builder` against the children of the node matched by the step
    /// preceding this call on the same level.
    ///
    /// Consecutive `nest` calls all descend into that same node.
    pub fn nest<B>(self, builder: B) -> Self
    where
        B: FnOnce(Self) -> Self,
    {
        self.nest_group(None, builder)
    }

    /// Same as [`CommandBuilder::nest`], with a name for diagnostics.
    pub fn nest_named<B>(self, group_name: &str, builder: B) -> Self
    where
        B: FnOnce(Self) -> Self,
    {
        self.nest_group(Some(group_name.to_string()), builder)
    }

    fn nest_group<B>(mut self, group_name: Option<String>, builder: B) -> Self
    where
        B: FnOnce(Self) -> Self,
    {
        if !self.has_step {
            let group = group_name.clone().or_else(|| self.group_name.clone());
            self.fail(SiftError::NestWithoutStep { group });
        }

        let inner = builder(Self::with_ids(group_name.clone(), self.next_id));
        self.commands.push(Command::PushState { group_name });
        self.absorb(inner);
        self.commands.push(Command::PopState);
        self
    }

    /// Repeats `builder` while unconsumed siblings remain.
    pub fn loop_all<B>(self, builder: B) -> Self
    where
        B: FnOnce(Self) -> Self,
    {
        self.loop_while(MatchableBuilder::any_tag, builder)
    }

    /// Repeats `builder` while the next unconsumed sibling satisfies
    /// `predicate`.
    ///
    /// The loop stays on the current level; use `nest` inside it to go deeper.
    pub fn loop_while<P, B>(mut self, predicate: P, builder: B) -> Self
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
        B: FnOnce(Self) -> Self,
    {
        let predicate = self.predicate(predicate);
        let loop_id = self.next_command_id();

        let inner = builder(Self::with_ids(None, self.next_id));
        self.commands.push(Command::BeginLoop { loop_id, predicate });
        self.absorb_same_level(inner);
        self.commands.push(Command::EndLoop { loop_id });
        self
    }

    /// Runs `builder` only when the next unconsumed sibling satisfies
    /// `predicate`; otherwise the whole block is skipped and the cursor stays
    /// where it was.
    pub fn execute_if<P, B>(self, predicate: P, builder: B) -> Self
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
        B: FnOnce(Self) -> Self,
    {
        self.condition(predicate, builder, None::<fn(Self) -> Self>)
    }

    /// Like [`CommandBuilder::execute_if`] with an alternative block for
    /// when the predicate does not hold.
    pub fn execute_if_else<P, B, E>(self, predicate: P, if_branch: B, else_branch: E) -> Self
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
        B: FnOnce(Self) -> Self,
        E: FnOnce(Self) -> Self,
    {
        self.condition(predicate, if_branch, Some(else_branch))
    }

    fn condition<P, B, E>(mut self, predicate: P, if_branch: B, else_branch: Option<E>) -> Self
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
        B: FnOnce(Self) -> Self,
        E: FnOnce(Self) -> Self,
    {
        let predicate = self.predicate(predicate);
        let condition_id = self.next_command_id();

        let inner = if_branch(Self::with_ids(None, self.next_id));
        self.commands.push(Command::BeginCondition { condition_id, predicate });
        self.absorb_same_level(inner);

        if let Some(else_branch) = else_branch {
            let inner = else_branch(Self::with_ids(None, self.next_id));
            self.commands.push(Command::ConditionElse { condition_id });
            self.absorb_same_level(inner);
        }

        self.commands.push(Command::EndCondition { condition_id });
        self
    }

    /// Gives `accessor` the collector without matching anything, e.g. to
    /// open a new record before its fields are extracted.
    pub fn peek_collector<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.commands.push(Command::PeekCollector(std::sync::Arc::new(accessor)));
        self
    }

    pub fn breakpoint(mut self) -> Self {
        self.commands.push(Command::Breakpoint);
        self
    }

    /// Freezes the program.
    ///
    /// # Errors
    ///
    /// Returns the first error recorded while building.
    pub fn build(self) -> Result<CommandGroup<T>> {
        if let Some(error) = self.error {
            return Err(error);
        }

        Ok(CommandGroup::new(self.group_name, self.commands))
    }

    fn push_step(mut self, element: ElementSpec<T>) -> Self {
        if element.matchables().is_empty() {
            self.fail(SiftError::EmptyMatchables { tag: element.tag_name().to_string() });
        }

        self.commands.push(Command::Step(element));
        self.has_step = true;
        self
    }

    fn predicate<P>(&mut self, predicate: P) -> Vec<Matchable>
    where
        P: FnOnce(MatchableBuilder) -> MatchableBuilder,
    {
        let matchables = predicate(MatchableBuilder::new()).build();
        if matchables.is_empty() {
            self.fail(SiftError::EmptyMatchables { tag: "predicate".to_string() });
        }
        matchables
    }

    fn next_command_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Takes over the commands, id counter and error of a sub-builder.
    fn absorb(&mut self, inner: Self) {
        self.next_id = inner.next_id;
        if let Some(error) = inner.error {
            self.fail(error);
        }
        self.commands.extend(inner.commands);
    }

    /// Loop and condition bodies stay on this level, so their steps count as
    /// steps a following `nest` can descend into.
    fn absorb_same_level(&mut self, inner: Self) {
        self.has_step |= inner.has_step;
        self.absorb(inner);
    }

    fn fail(&mut self, error: SiftError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl<T> Default for CommandBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::PatternMatcher;

    fn kinds<T>(group: &CommandGroup<T>) -> Vec<&'static str> {
        group
            .commands()
            .iter()
            .map(|command| match command {
                Command::Step(_) => "step",
                Command::ConditionalStep { .. } => "cstep",
                Command::PushState { .. } => "push",
                Command::PopState => "pop",
                Command::BeginLoop { .. } => "loop",
                Command::EndLoop { .. } => "endloop",
                Command::BeginCondition { .. } => "if",
                Command::ConditionElse { .. } => "else",
                Command::EndCondition { .. } => "endif",
                Command::PeekCollector(_) => "peek",
                Command::Breakpoint => "break",
            })
            .collect()
    }

    #[test]
    fn test_nest_compiles_to_push_pop() {
        let group = CommandBuilder::<()>::new()
            .html()
            .nest(|b| b.body().breakpoint())
            .build()
            .unwrap();

        assert_eq!(kinds(&group), vec!["step", "push", "step", "break", "pop"]);
    }

    #[test]
    fn test_loops_get_distinct_ids() {
        let group = CommandBuilder::<()>::new()
            .loop_all(|b| b.div(|m| m.any_tag()).nest(|b| b.loop_all(|b| b.span(|m| m.any_tag()))))
            .build()
            .unwrap();

        let ids: Vec<usize> = group
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::BeginLoop { loop_id, .. } => Some(*loop_id),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_ids_unique_across_siblings() {
        let group = CommandBuilder::<()>::new()
            .execute_if(|m| m.any_tag(), |b| b.div(|m| m.any_tag()))
            .loop_all(|b| b.div(|m| m.any_tag()))
            .execute_if(|m| m.any_tag(), |b| b.loop_all(|b| b.span(|m| m.any_tag())))
            .build()
            .unwrap();

        let mut ids: Vec<usize> = group
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::BeginLoop { loop_id, .. } => Some(*loop_id),
                Command::BeginCondition { condition_id, .. } => Some(*condition_id),
                _ => None,
            })
            .collect();
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();

        assert_eq!(count, 4);
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn test_if_else_layout() {
        let group = CommandBuilder::<()>::new()
            .execute_if_else(
                |m| m.class_name(PatternMatcher::equals("a")),
                |b| b.div(|m| m.any_tag()),
                |b| b.span(|m| m.any_tag()),
            )
            .build()
            .unwrap();

        assert_eq!(kinds(&group), vec!["if", "step", "else", "step", "endif"]);
    }

    #[test]
    fn test_empty_matchables_is_build_error() {
        let result = CommandBuilder::<()>::new().div(|m| m).build();
        assert!(matches!(result, Err(SiftError::EmptyMatchables { tag }) if tag == "div"));
    }

    #[test]
    fn test_empty_predicate_is_build_error() {
        let result = CommandBuilder::<()>::new().loop_while(|m| m, |b| b.div(|m| m.any_tag())).build();
        assert!(matches!(result, Err(SiftError::EmptyMatchables { .. })));
    }

    #[test]
    fn test_nest_without_step_is_build_error() {
        let result = CommandBuilder::<()>::new().nest(|b| b.body()).build();
        assert!(matches!(result, Err(SiftError::NestWithoutStep { group: None })));

        let result = CommandBuilder::<()>::new()
            .html()
            .nest(|b| b.nest_named("orphan", |b| b.body()))
            .build();
        assert!(matches!(result, Err(SiftError::NestWithoutStep { group: Some(name) }) if name == "orphan"));
    }

    #[test]
    fn test_nest_after_loop_body_step_is_allowed() {
        let result = CommandBuilder::<()>::new()
            .loop_all(|b| b.tag("li", |m| m.any_tag()))
            .nest(|b| b.a(|m| m.any_tag()))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_conditional_step_counts_as_step() {
        let result = CommandBuilder::<()>::new()
            .tag_if(|m| m.any_tag(), "div", |m| m.any_tag(), |e| e, |_, _, _| {})
            .nest(|b| b.span(|m| m.any_tag()))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_heading_tag_name() {
        let group = CommandBuilder::<()>::new().heading(2, |m| m.any_tag()).build().unwrap();

        match &group.commands()[0] {
            Command::Step(element) => assert_eq!(element.tag_name(), "h2"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_group_name() {
        let group = CommandBuilder::<()>::named("search").html().build().unwrap();
        assert_eq!(group.group_name(), Some("search"));
    }
}
