//! The flat instruction set executed by [`CommandExecutor`](crate::CommandExecutor).
//!
//! Programs are produced by [`CommandBuilder`](crate::CommandBuilder) and are
//! immutable afterwards; a [`CommandGroup`] can be cloned cheaply and shared
//! between threads, each running its own executor.

use std::fmt;
use std::sync::Arc;

use crate::element::ElementSpec;
use crate::matcher::Matchable;

/// Callback that may touch the collector without matching anything.
pub type CollectorFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// One instruction of a compiled program.
pub enum Command<T> {
    /// Scan forward through the current siblings for one matching node.
    Step(ElementSpec<T>),
    /// Like `Step`, but only when `predicate` holds for the next unconsumed node.
    ConditionalStep { predicate: Vec<Matchable>, element: ElementSpec<T> },
    /// Descend into the children of the node matched last on this level.
    PushState { group_name: Option<String> },
    PopState,
    BeginLoop { loop_id: usize, predicate: Vec<Matchable> },
    EndLoop { loop_id: usize },
    BeginCondition { condition_id: usize, predicate: Vec<Matchable> },
    ConditionElse { condition_id: usize },
    EndCondition { condition_id: usize },
    PeekCollector(CollectorFn<T>),
    /// No effect on the cursor; a place to hang debug output.
    Breakpoint,
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(element) => f.debug_tuple("Step").field(element).finish(),
            Self::ConditionalStep { predicate, element } => f
                .debug_struct("ConditionalStep")
                .field("predicate", predicate)
                .field("element", element)
                .finish(),
            Self::PushState { group_name } => f.debug_struct("PushState").field("group_name", group_name).finish(),
            Self::PopState => f.write_str("PopState"),
            Self::BeginLoop { loop_id, predicate } => f
                .debug_struct("BeginLoop")
                .field("loop_id", loop_id)
                .field("predicate", predicate)
                .finish(),
            Self::EndLoop { loop_id } => f.debug_struct("EndLoop").field("loop_id", loop_id).finish(),
            Self::BeginCondition { condition_id, predicate } => f
                .debug_struct("BeginCondition")
                .field("condition_id", condition_id)
                .field("predicate", predicate)
                .finish(),
            Self::ConditionElse { condition_id } => f
                .debug_struct("ConditionElse")
                .field("condition_id", condition_id)
                .finish(),
            Self::EndCondition { condition_id } => f
                .debug_struct("EndCondition")
                .field("condition_id", condition_id)
                .finish(),
            Self::PeekCollector(_) => f.write_str("PeekCollector(..)"),
            Self::Breakpoint => f.write_str("Breakpoint"),
        }
    }
}

/// A compiled, immutable program.
pub struct CommandGroup<T> {
    group_name: Option<String>,
    commands: Arc<[Command<T>]>,
}

impl<T> CommandGroup<T> {
    pub(crate) fn new(group_name: Option<String>, commands: Vec<Command<T>>) -> Self {
        Self { group_name, commands: commands.into() }
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn commands(&self) -> &[Command<T>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl<T> Clone for CommandGroup<T> {
    fn clone(&self) -> Self {
        Self { group_name: self.group_name.clone(), commands: Arc::clone(&self.commands) }
    }
}

impl<T> fmt::Debug for CommandGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("group_name", &self.group_name)
            .field("commands", &self.commands)
            .finish()
    }
}

/// First index at or after `start` satisfying `is_target`.
///
/// Used by the executor to skip loop and condition bodies.
pub(crate) fn find_forward<T>(commands: &[Command<T>], start: usize, is_target: impl Fn(&Command<T>) -> bool) -> Option<usize> {
    commands
        .get(start..)?
        .iter()
        .position(is_target)
        .map(|offset| start + offset)
}

/// Index of the nearest command before `start` satisfying `is_target`.
pub(crate) fn find_backward<T>(commands: &[Command<T>], start: usize, is_target: impl Fn(&Command<T>) -> bool) -> Option<usize> {
    commands[..start.min(commands.len())]
        .iter()
        .rposition(is_target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_send_sync<S: Send + Sync>() {}

    #[test]
    fn test_command_group_is_shareable() {
        is_send_sync::<CommandGroup<Vec<String>>>();
    }

    #[test]
    fn test_find_markers() {
        let commands: Vec<Command<()>> = vec![
            Command::BeginLoop { loop_id: 3, predicate: Vec::new() },
            Command::Breakpoint,
            Command::EndLoop { loop_id: 3 },
        ];

        let end = find_forward(&commands, 0, |command| matches!(command, Command::EndLoop { loop_id: 3 }));
        let begin = find_backward(&commands, 2, |command| matches!(command, Command::BeginLoop { loop_id: 3, .. }));

        assert_eq!(end, Some(2));
        assert_eq!(begin, Some(0));
    }

    #[test]
    fn test_clone_shares_commands() {
        let group: CommandGroup<()> = CommandGroup::new(Some("root".to_string()), vec![Command::Breakpoint]);
        let clone = group.clone();

        assert_eq!(clone.group_name(), Some("root"));
        assert!(std::ptr::eq(group.commands().as_ptr(), clone.commands().as_ptr()));
    }
}
