//! Senders and per-invocation context.

use std::fmt;
use std::sync::Arc;

use crate::output::Message;

/// A block position in the sender's world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Whoever issued a command.
///
/// The engine only asks questions of a sender and sends it messages. Permission
/// policy belongs to the host.
pub trait CommandSender: Send + Sync {
    fn name(&self) -> &str;

    fn has_permission(&self, permission: &str) -> bool;

    /// Interactive senders are people at a prompt, as opposed to scripts or
    /// the host itself.
    fn is_interactive(&self) -> bool {
        false
    }

    /// Position used to resolve relative coordinates, when the sender has one.
    fn location(&self) -> Option<Location> {
        None
    }

    fn send(&self, message: Message);
}

/// Routing state threaded through the dispatch tree.
#[derive(Clone)]
pub struct Invocation {
    pub sender: Arc<dyn CommandSender>,
    /// Name of the root host command.
    pub command: String,
    /// Usage the host declared for the root command. Leaves without a usage
    /// string of their own fall back to it.
    pub usage: Option<String>,
    /// Aliases used so far, root first.
    pub path: Vec<String>,
}

impl Invocation {
    pub fn new(sender: Arc<dyn CommandSender>, command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            sender,
            path: vec![command.clone()],
            command,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Option<String>) -> Self {
        self.usage = usage;
        self
    }

    /// Invocation one level deeper, reached through `alias`.
    pub fn descend(&self, alias: &str) -> Self {
        let mut path = self.path.clone();
        path.push(alias.to_string());
        Self {
            sender: Arc::clone(&self.sender),
            command: self.command.clone(),
            usage: self.usage.clone(),
            path,
        }
    }

    pub fn alias(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or(&self.command)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("sender", &self.sender.name())
            .field("command", &self.command)
            .field("path", &self.path)
            .finish()
    }
}

/// Everything a leaf's callback and parsers know about the current invocation.
#[derive(Clone)]
pub struct CommandContext {
    pub sender: Arc<dyn CommandSender>,
    /// Name of the root host command.
    pub command: String,
    /// Aliases used to reach this leaf, root first.
    pub path: Vec<String>,
    /// Argument tokens for this leaf, after routing.
    pub tokens: Vec<String>,
    /// Usage string shown when parsing fails.
    pub usage: String,
}

impl CommandContext {
    pub fn new(invocation: &Invocation, tokens: &[String], usage: impl Into<String>) -> Self {
        Self {
            sender: Arc::clone(&invocation.sender),
            command: invocation.command.clone(),
            path: invocation.path.clone(),
            tokens: tokens.to_vec(),
            usage: usage.into(),
        }
    }

    /// The alias this leaf was invoked by.
    pub fn alias(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or(&self.command)
    }

    /// Alias of the node that routed to this leaf, or the root command.
    pub fn parent_alias(&self) -> &str {
        self.path
            .iter()
            .rev()
            .nth(1)
            .map(String::as_str)
            .unwrap_or(&self.command)
    }

    pub fn reply(&self, message: Message) {
        self.sender.send(message);
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("sender", &self.sender.name())
            .field("command", &self.command)
            .field("path", &self.path)
            .field("tokens", &self.tokens)
            .field("usage", &self.usage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl CommandSender for Silent {
        fn name(&self) -> &str {
            "silent"
        }
        fn has_permission(&self, _permission: &str) -> bool {
            true
        }
        fn send(&self, _message: Message) {}
    }

    #[test]
    fn test_descend_extends_path() {
        let root = Invocation::new(Arc::new(Silent), "calc");
        let child = root.descend("add");
        assert_eq!(root.path, vec!["calc"]);
        assert_eq!(child.path, vec!["calc", "add"]);
        assert_eq!(child.alias(), "add");
        assert_eq!(child.command, "calc");
    }

    #[test]
    fn test_context_aliases() {
        let invocation = Invocation::new(Arc::new(Silent), "calc").descend("help");
        let ctx = CommandContext::new(&invocation, &["add".to_string()], "help [subcommand]");
        assert_eq!(ctx.alias(), "help");
        assert_eq!(ctx.parent_alias(), "calc");
        assert_eq!(ctx.tokens, vec!["add"]);
    }

    #[test]
    fn test_default_sender_capabilities() {
        let sender = Silent;
        assert!(!sender.is_interactive());
        assert_eq!(sender.location(), None);
    }
}
