//! Console host for command trees.
//!
//! Reads lines from stdin (or a single `--exec` line), tokenizes them on
//! whitespace and routes them through a [`CommandRegistry`].
//!
//! [`CommandRegistry`]: crate::registry::CommandRegistry

pub mod demo;
pub mod entrypoint;
mod sender;

pub use sender::{
    BufferedSender, CONSOLE_SPAWN, ConsoleSender, GRANT_ALL, tokenize, tokenize_for_completion,
};
