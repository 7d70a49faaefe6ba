//! Error types for parsing, building and executing commands.
//!
//! Errors come in two tiers:
//!
//! - **User-input errors** ([`ArgumentParseError`], [`CommandParseError`]) carry a
//!   user-facing message and are always recoverable. They are rendered to the
//!   sender together with the usage string and never escape a dispatch.
//! - **Configuration errors** ([`BuildError`]) are fatal. They are raised while
//!   builders run, so a mis-declared command fails at setup time instead of on
//!   its first invocation.
//!
//! [`CommandError`] is what application callbacks return.

use std::path::PathBuf;

use thiserror::Error;

/// Raised by an [`ArgumentParser`](crate::parser::ArgumentParser) when a token
/// is not a valid value.
///
/// The message is shown to the user when this failure aborts the command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ArgumentParseError {
    message: String,
}

impl ArgumentParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A whole invocation could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CommandParseError {
    message: String,
}

impl CommandParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ArgumentParseError> for CommandParseError {
    fn from(error: ArgumentParseError) -> Self {
        Self {
            message: error.message,
        }
    }
}

/// Fatal configuration errors, detected while commands are being built or
/// registered.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "parameter '{param}' of '{method}' has a transforming tag ({tag}) as its first inference tag \
         and no default parser is registered for {ty}"
    )]
    TransformerWithoutParser {
        method: String,
        param: String,
        tag: String,
        ty: &'static str,
    },

    #[error(
        "parameter '{param}' of '{method}' has a non-transforming tag ({tag}) after a previous \
         argument inference tag"
    )]
    ProducerAfterPrevious {
        method: String,
        param: String,
        tag: String,
    },

    #[error(
        "parameter '{param}' of '{method}' was not tagged appropriately and no default parser is \
         registered for {ty}"
    )]
    MissingParser {
        method: String,
        param: String,
        ty: &'static str,
    },

    #[error("variadic parameter '{param}' of '{method}' must be the last parameter")]
    VariadicNotLast { method: String, param: String },

    #[error("tag {tag} on parameter '{param}' of '{method}' failed: {reason}")]
    TagFailed {
        method: String,
        param: String,
        tag: String,
        reason: String,
    },

    #[error("parameter '{param}' of '{method}' expects {expected} but its parser produces {found}")]
    ParserTypeMismatch {
        method: String,
        param: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter '{param}' of '{method}' is not nullable but its parser is optional")]
    OptionalIntoNonNullable { method: String, param: String },

    #[error("no zero argument methods or fields in {owner} were named '{name}'")]
    MemberNotFound { owner: String, name: String },

    #[error("got {found} from member '{name}' of {owner} but expected an argument parser")]
    MemberNotParser {
        owner: String,
        name: String,
        found: &'static str,
    },

    #[error("member '{name}' of {owner} failed: {reason}")]
    MemberFailed {
        owner: String,
        name: String,
        reason: String,
    },

    #[error("arguments already added; inference must be the only argument configuration")]
    ArgumentsAlreadyAdded,

    #[error("no arguments can be added after a variadic argument or inference")]
    ArgumentsClosed,

    #[error("'{method}' expected {expected} arguments but {found} were supplied")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("{found} is not assignable to {expected} (parameter '{param}' of '{method}')")]
    ValueTypeMismatch {
        method: String,
        param: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "parameter '{param}' of '{method}' has type {ty} which cannot be omitted, declare it \
         nullable instead"
    )]
    NullToNonNullable {
        method: String,
        param: String,
        ty: &'static str,
    },

    #[error("had a variadic argument for non-variadic command '{method}'")]
    UnexpectedVariadic { method: String },

    #[error("missing variadic argument for variadic command '{method}'")]
    MissingVariadic { method: String },

    #[error("cannot register a default parser for the unit type")]
    UnitDefault,

    #[error("invalid command name '{name}': names must be non-empty and contain no whitespace")]
    InvalidName { name: String },

    #[error("subcommand '{name}' is already registered")]
    DuplicateChild { name: String },

    #[error("metadata must be configured before any subcommands are added")]
    MetadataAfterChildren,

    #[error("command '{name}' was not declared by the host")]
    UnknownHostCommand { name: String },

    #[error("command '{name}' already has a handler")]
    HandlerAlreadyAttached { name: String },

    #[error("auto command {type_name} did not have an appropriate kind (expected {expected})")]
    InappropriateKind {
        type_name: String,
        expected: &'static str,
    },

    #[error("factory for {type_name} failed: {reason}")]
    FactoryFailed { type_name: String, reason: String },
}

/// Returned by application callbacks.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The arguments were syntactically valid but rejected by the command.
    /// Routed to the callback's failure path like any parse error.
    #[error(transparent)]
    Usage(#[from] CommandParseError),

    /// The sender may not run this command. The message is shown as-is.
    #[error("{0}")]
    Rejected(String),

    /// Anything else. Logged in full and reported to the sender as a generic
    /// internal error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CommandError {
    pub fn usage(message: impl Into<String>) -> Self {
        CommandError::Usage(CommandParseError::new(message))
    }
}

impl From<ArgumentParseError> for CommandError {
    fn from(error: ArgumentParseError) -> Self {
        CommandError::Usage(error.into())
    }
}

impl From<BuildError> for CommandError {
    fn from(error: BuildError) -> Self {
        CommandError::Internal(anyhow::Error::new(error))
    }
}

/// Errors from the strict metadata loader.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse metadata at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
