//! # cmdbuilder
//!
//! Parse, dispatch and complete text commands.
//!
//! A line of input is split into tokens and routed through a tree of
//! commands. Composite nodes pick a named child by the first token; leaf
//! nodes turn the remaining tokens into typed values with a list of
//! [`ArgumentParser`]s and hand them to a callback. Every node answers
//! completion requests for the token being typed.
//!
//! Parsers for a leaf can be listed by hand with [`CommandBuilder`], or
//! inferred from an [`Executable`]'s [`Signature`]: each parameter is
//! resolved through its [`ParserTag`]s, falling back to the
//! [`DefaultInferenceProvider`] for its type.
//!
//! ```
//! use cmdbuilder::callback::from_fn;
//! use cmdbuilder::command::CompositeCommandBuilder;
//! use cmdbuilder::console::BufferedSender;
//! use cmdbuilder::output::Message;
//! use cmdbuilder::parser::IntegerArgument;
//! use cmdbuilder::registry::CommandRegistry;
//! use std::sync::Arc;
//!
//! let mut math = CompositeCommandBuilder::new();
//! math.command(
//!     "add",
//!     "Add two integers",
//!     "math add <a> <b>",
//!     |b| {
//!         b.argument(IntegerArgument::new())?
//!             .argument(IntegerArgument::new())?;
//!         Ok(())
//!     },
//!     from_fn(|args, ctx| {
//!         let sum = args.get::<i32>(0)? + args.get::<i32>(1)?;
//!         ctx.reply(Message::Info(sum.to_string()));
//!         Ok(())
//!     }),
//! )?;
//!
//! let mut registry = CommandRegistry::default();
//! registry.declare("math", None)?;
//! registry.attach("math", math.build())?;
//!
//! let sender = Arc::new(BufferedSender::new("doc"));
//! let tokens: Vec<String> = ["math", "add", "2", "3"].map(String::from).to_vec();
//! registry.dispatch(sender.clone(), &tokens);
//! assert_eq!(sender.take_plain(), vec!["5"]);
//! # Ok::<(), cmdbuilder::error::BuildError>(())
//! ```
//!
//! [`ArgumentParser`]: parser::ArgumentParser
//! [`CommandBuilder`]: command::CommandBuilder
//! [`Executable`]: callback::Executable
//! [`Signature`]: signature::Signature
//! [`ParserTag`]: inference::ParserTag
//! [`DefaultInferenceProvider`]: inference::DefaultInferenceProvider

pub mod auto;
pub mod callback;
pub mod command;
pub mod console;
pub mod context;
pub mod error;
pub mod inference;
pub mod metadata;
pub mod output;
pub mod parser;
pub mod registry;
pub mod signature;
pub mod value;

pub use auto::{AutoCandidate, AutoCommandBuilder, RegistrationReport};
pub use callback::{Arguments, CommandCallback, Executable, ExecutableCallback};
pub use command::{
    CommandBuilder, CommandNode, CompositeCommand, CompositeCommandBuilder, DispatchOutcome,
    LeafCommand,
};
pub use context::{CommandContext, CommandSender, Invocation};
pub use error::{ArgumentParseError, BuildError, CommandError, CommandParseError};
pub use parser::{ArgumentParser, ArgumentParserExt};
pub use registry::CommandRegistry;
pub use signature::{Param, Signature};
pub use value::{TypeKey, Value};
