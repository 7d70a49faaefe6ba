//! Command trees.
//!
//! A tree is built once, through [`CommandBuilder`] for leaves and
//! [`CompositeCommandBuilder`] for nodes with named children, and is immutable
//! afterwards. Built nodes are cheap to clone and safe to dispatch from many
//! threads at once.

mod builder;
mod composite;
mod help;
mod leaf;
mod traits;

pub use builder::CommandBuilder;
pub use composite::{Child, CompositeCommand, CompositeCommandBuilder};
pub use help::{HELP_DESCRIPTION, HELP_NAME, HELP_USAGE};
pub use leaf::LeafCommand;
pub use traits::{
    CompositeSubCommand, CompositeTopLevelCommand, SubCommand, TopLevelCommand,
    build_composite_top_level, build_top_level,
};
pub(crate) use traits::build_composite_top_level_with;

use crate::context::Invocation;

/// Reply sent when a parser or callback fails unexpectedly.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred while attempting to perform this command";

/// How a dispatch ended. Every outcome except `Executed` has already been
/// reported to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Executed,
    ParseFailed,
    NoSuchSubcommand,
    Rejected,
    InternalError,
    /// A composite was invoked without a subcommand and ran its empty action.
    EmptyInvocation,
}

/// A node of a command tree.
#[derive(Clone)]
pub enum CommandNode {
    Leaf(LeafCommand),
    Composite(CompositeCommand),
}

impl CommandNode {
    pub fn dispatch(&self, invocation: &Invocation, tokens: &[String]) -> DispatchOutcome {
        match self {
            CommandNode::Leaf(leaf) => leaf.execute(invocation, tokens),
            CommandNode::Composite(composite) => composite.dispatch(invocation, tokens),
        }
    }

    /// Candidates for the last token in `tokens`.
    pub fn complete(&self, invocation: &Invocation, tokens: &[String]) -> Vec<String> {
        match self {
            CommandNode::Leaf(leaf) => leaf.complete(invocation, tokens),
            CommandNode::Composite(composite) => composite.complete(invocation, tokens),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, CommandNode::Composite(_))
    }
}

impl From<LeafCommand> for CommandNode {
    fn from(leaf: LeafCommand) -> Self {
        CommandNode::Leaf(leaf)
    }
}

impl From<CompositeCommand> for CommandNode {
    fn from(composite: CompositeCommand) -> Self {
        CommandNode::Composite(composite)
    }
}

/// A description, usage or permission a node may supply itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Property<T> {
    Explicit(T),
    /// Look the value up in the fallback metadata.
    #[default]
    Deferred,
    /// Deliberately no value. For a permission: visible to everyone, whatever
    /// the metadata says.
    Absent,
}

impl<T> From<Option<T>> for Property<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Property::Explicit(value),
            None => Property::Absent,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), crate::error::BuildError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        Err(crate::error::BuildError::InvalidName {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}
