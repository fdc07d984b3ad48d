//! Stack machine that runs a [`CommandGroup`] against a parsed document.
//!
//! The executor keeps one cursor per nesting level: the sibling list being
//! scanned, the index of the next unconsumed sibling, and the node matched
//! last on that level. `PushState` saves the cursor and descends into the
//! children of that last matched node; `PopState` restores it.
//!
//! Matching never fails a run. A step that finds nothing leaves the cursor
//! where it was and is logged at debug level; only a structurally broken
//! program (which [`CommandBuilder`](crate::CommandBuilder) never produces)
//! yields an error.
//!
//! # Example
//!
//! ```rust
//! use sift_core::{CommandBuilder, CommandExecutor, Document, ExecutorConfig, PatternMatcher};
//!
//! let program = CommandBuilder::<Vec<String>>::new()
//!     .html()
//!     .nest(|b| {
//!         b.body().nest(|b| {
//!             b.tag_extract(
//!                 "h1",
//!                 |m| m.class_name(PatternMatcher::equals("title")),
//!                 |e| e.text(),
//!                 |_, values, titles: &mut Vec<String>| titles.extend(values.text().map(str::to_string)),
//!             )
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! let config = ExecutorConfig::builder().debug_mode(true).build();
//! let mut executor = CommandExecutor::with_config(config);
//! let mut titles = Vec::new();
//!
//! executor
//!     .execute_commands(&Document::parse(r#"<h1 class="title">Hello</h1>"#), &program, &mut titles)
//!     .unwrap();
//! assert_eq!(titles, vec!["Hello"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandGroup, find_backward, find_forward};
use crate::element::ElementSpec;
use crate::error::{Result, SiftError};
use crate::matcher::{Matchable, match_all};
use crate::parse::{Document, Node};

/// Configuration for the command interpreter.
///
/// # Example
///
/// ```rust
/// use sift_core::ExecutorConfig;
///
/// let config: ExecutorConfig = serde_json::from_str(r#"{"max_loop_iterations": 50}"#).unwrap();
/// assert_eq!(config.max_loop_iterations, Some(50));
/// assert!(!config.debug_mode);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Emit a debug event at every `Breakpoint` and a trace event per
    /// instruction (default: false).
    pub debug_mode: bool,

    /// Upper bound on iterations of any single loop entry (default: none).
    pub max_loop_iterations: Option<usize>,

    /// Log the remaining siblings when a step misses (default: false).
    pub dump_nodes_on_miss: bool,
}

impl ExecutorConfig {
    /// Creates a new builder for ExecutorConfig.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }
}

/// Builder for ExecutorConfig.
pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ExecutorConfig::default() }
    }

    /// Sets whether breakpoints and instructions are logged.
    pub fn debug_mode(mut self, value: bool) -> Self {
        self.config.debug_mode = value;
        self
    }

    /// Sets the per-loop iteration ceiling.
    pub fn max_loop_iterations(mut self, value: usize) -> Self {
        self.config.max_loop_iterations = Some(value);
        self
    }

    /// Sets whether the remaining siblings are logged on a miss.
    pub fn dump_nodes_on_miss(mut self, value: bool) -> Self {
        self.config.dump_nodes_on_miss = value;
        self
    }

    /// Builds the ExecutorConfig.
    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters describing the most recent run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub commands_executed: usize,
    pub steps_matched: usize,
    pub steps_missed: usize,
    pub loop_iterations: usize,
}

/// Runs compiled programs.
///
/// An executor holds no document state between runs, so one instance can run
/// any number of programs one after another. Runs on the same instance are
/// serialized by `&mut self`; use one executor per thread for parallel work.
#[derive(Debug, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
    stats: ExecutionStats,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config, stats: ExecutionStats::default() }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Counters of the last run, reset at the start of every run.
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Runs `group` over the top-level nodes of `document`, populating
    /// `collector` through the program's callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::MalformedProgram`] when loop, condition or scope
    /// markers are unbalanced. Misses are never errors.
    pub fn execute_commands<T>(&mut self, document: &Document, group: &CommandGroup<T>, collector: &mut T) -> Result<()> {
        self.execute_nodes(document.root_nodes(), group, collector)
    }

    /// Runs `group` with `nodes` as the initial sibling list.
    ///
    /// # Errors
    ///
    /// Same as [`CommandExecutor::execute_commands`].
    pub fn execute_nodes<T>(&mut self, nodes: Vec<Node<'_>>, group: &CommandGroup<T>, collector: &mut T) -> Result<()> {
        self.stats = ExecutionStats::default();

        tracing::debug!(
            group = group.group_name().unwrap_or("<root>"),
            commands = group.len(),
            nodes = nodes.len(),
            "executing commands"
        );

        let commands = group.commands();
        let mut state = ParserState::new(nodes);
        let mut pc = 0;

        while pc < commands.len() {
            let command = &commands[pc];
            self.stats.commands_executed += 1;

            if self.config.debug_mode {
                tracing::trace!(pc, index = state.frame.index, depth = state.stack.len(), ?command, "command");
            }

            pc = match command {
                Command::Step(element) => {
                    self.step(&mut state, element, collector);
                    pc + 1
                }
                Command::ConditionalStep { predicate, element } => {
                    if state.next_matches(predicate) {
                        self.step(&mut state, element, collector);
                    } else {
                        state.frame.last_matched = None;
                    }
                    pc + 1
                }
                Command::PushState { group_name } => {
                    state.push();
                    tracing::trace!(group = group_name.as_deref().unwrap_or("<nested>"), nodes = state.frame.nodes.len(), "push state");
                    pc + 1
                }
                Command::PopState => {
                    if !state.pop() {
                        return Err(SiftError::MalformedProgram(format!("PopState at {pc} without matching PushState")));
                    }
                    pc + 1
                }
                Command::BeginLoop { loop_id, predicate } => self.begin_loop(&mut state, commands, pc, *loop_id, predicate)?,
                Command::EndLoop { loop_id } => self.end_loop(&mut state, commands, pc, *loop_id)?,
                Command::BeginCondition { condition_id, predicate } => {
                    if state.next_matches(predicate) {
                        pc + 1
                    } else {
                        state.frame.last_matched = None;
                        let target = find_forward(commands, pc + 1, |command| {
                            matches!(command,
                                Command::ConditionElse { condition_id: id } | Command::EndCondition { condition_id: id }
                                if id == condition_id)
                        })
                        .ok_or_else(|| unbalanced("BeginCondition", *condition_id, pc))?;
                        target + 1
                    }
                }
                Command::ConditionElse { condition_id } => {
                    let end = find_forward(commands, pc + 1, |command| {
                        matches!(command, Command::EndCondition { condition_id: id } if id == condition_id)
                    })
                    .ok_or_else(|| unbalanced("ConditionElse", *condition_id, pc))?;
                    end + 1
                }
                Command::EndCondition { .. } => pc + 1,
                Command::PeekCollector(accessor) => {
                    accessor(collector);
                    pc + 1
                }
                Command::Breakpoint => {
                    if self.config.debug_mode {
                        tracing::debug!(
                            pc,
                            index = state.frame.index,
                            remaining = state.frame.remaining(),
                            depth = state.stack.len(),
                            last_matched = state.frame.last_matched.and_then(|node| node.tag_name()).unwrap_or("<none>"),
                            "breakpoint"
                        );
                    }
                    pc + 1
                }
            };
        }

        if !state.stack.is_empty() {
            return Err(SiftError::MalformedProgram(format!("{} PushState without matching PopState", state.stack.len())));
        }

        tracing::debug!(
            matched = self.stats.steps_matched,
            missed = self.stats.steps_missed,
            loop_iterations = self.stats.loop_iterations,
            "execution finished"
        );

        Ok(())
    }

    fn step<T>(&mut self, state: &mut ParserState<'_>, element: &ElementSpec<T>, collector: &mut T) {
        let frame = &mut state.frame;
        let found = frame.nodes[frame.index..].iter().position(|node| element.matches(*node));

        match found {
            Some(offset) => {
                let index = frame.index + offset;
                let node = frame.nodes[index];
                element.extract(node, collector);
                frame.last_matched = Some(node);
                frame.index = index + 1;
                self.stats.steps_matched += 1;
            }
            None => {
                frame.last_matched = None;
                self.stats.steps_missed += 1;
                tracing::debug!(tag = element.tag_name(), index = frame.index, remaining = frame.remaining(), "step missed");

                if self.config.dump_nodes_on_miss {
                    for (index, node) in frame.nodes.iter().enumerate().skip(frame.index) {
                        tracing::debug!(index, node = %node.html(), "unmatched sibling");
                    }
                }
            }
        }
    }

    fn begin_loop<T>(
        &mut self, state: &mut ParserState<'_>, commands: &[Command<T>], pc: usize, loop_id: usize,
        predicate: &[Matchable],
    ) -> Result<usize> {
        let resumed = state.loops.last().is_some_and(|active| active.loop_id == loop_id);
        if !resumed {
            state.loops.push(LoopState { loop_id, iterations: 0, start_index: state.frame.index });
        }

        let iterations = state.loops.last().map_or(0, |active| active.iterations);
        let capped = self.config.max_loop_iterations.is_some_and(|max| iterations >= max);

        if !capped && state.next_matches(predicate) {
            self.stats.loop_iterations += 1;
            return Ok(pc + 1);
        }

        if capped {
            tracing::debug!(loop_id, iterations, "loop reached its iteration ceiling");
        }

        state.loops.pop();
        let end = find_forward(commands, pc + 1, |command| matches!(command, Command::EndLoop { loop_id: id } if *id == loop_id))
            .ok_or_else(|| unbalanced("BeginLoop", loop_id, pc))?;
        Ok(end + 1)
    }

    fn end_loop<T>(&mut self, state: &mut ParserState<'_>, commands: &[Command<T>], pc: usize, loop_id: usize) -> Result<usize> {
        let active = match state.loops.last_mut() {
            Some(active) if active.loop_id == loop_id => active,
            _ => return Err(unbalanced("EndLoop", loop_id, pc)),
        };

        active.iterations += 1;

        if state.frame.index == active.start_index {
            tracing::debug!(loop_id, iterations = active.iterations, "loop consumed nothing, finishing");
            state.loops.pop();
            return Ok(pc + 1);
        }

        active.start_index = state.frame.index;
        find_backward(commands, pc, |command| matches!(command, Command::BeginLoop { loop_id: id, .. } if *id == loop_id))
            .ok_or_else(|| unbalanced("EndLoop", loop_id, pc))
    }
}

fn unbalanced(marker: &str, id: usize, pc: usize) -> SiftError {
    SiftError::MalformedProgram(format!("{marker} {id} at {pc} has no counterpart"))
}

/// Cursor over one sibling list.
struct Frame<'a> {
    nodes: Vec<Node<'a>>,
    index: usize,
    last_matched: Option<Node<'a>>,
}

impl<'a> Frame<'a> {
    fn new(nodes: Vec<Node<'a>>) -> Self {
        Self { nodes, index: 0, last_matched: None }
    }

    fn peek(&self) -> Option<Node<'a>> {
        self.nodes.get(self.index).copied()
    }

    fn remaining(&self) -> usize {
        self.nodes.len().saturating_sub(self.index)
    }
}

struct LoopState {
    loop_id: usize,
    iterations: usize,
    start_index: usize,
}

/// Traversal state of a single run.
struct ParserState<'a> {
    frame: Frame<'a>,
    stack: Vec<Frame<'a>>,
    loops: Vec<LoopState>,
}

impl<'a> ParserState<'a> {
    fn new(nodes: Vec<Node<'a>>) -> Self {
        Self { frame: Frame::new(nodes), stack: Vec::new(), loops: Vec::new() }
    }

    fn next_matches(&self, predicate: &[Matchable]) -> bool {
        self.frame.peek().is_some_and(|node| match_all(predicate, node))
    }

    fn push(&mut self) {
        let children = self.frame.last_matched.map(|node| node.children()).unwrap_or_default();
        let parent = std::mem::replace(&mut self.frame, Frame::new(children));
        self.stack.push(parent);
    }

    fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some(parent) => {
                self.frame = parent;
                true
            }
            None => false,
        }
    }
}
