//! Argument parsers.
//!
//! An [`ArgumentParser`] turns one token into a typed value, suggests
//! completions for a partially typed token and says whether its slot may be
//! left out. Parsers are immutable: combinators from [`ArgumentParserExt`]
//! wrap a parser in a new one and leave the original untouched, so one parser
//! can be shared by any number of commands.
//!
//! Commands store parsers of mixed output types, so they hold them as
//! [`ErasedParser`]s, which produce [`Value`]s.

mod combinators;
mod coord;
mod numeric;
mod string;

pub use combinators::{CompletionMode, CompletionOverride, OptionalOverride, Transform};
pub use coord::{Axis, CoordArgument};
pub use numeric::{FloatArgument, IntegerArgument};
pub use string::{StringArgument, StringSetArgument};

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::context::CommandContext;
use crate::error::ArgumentParseError;
use crate::value::{TypeKey, Value};

pub trait ArgumentParser: Send + Sync + 'static {
    type Output: Any + Send + Sync;

    /// Parse `token`, the argument at `position` (0-based, after routing).
    ///
    /// Must not depend on anything but its inputs and the parser's own
    /// immutable state.
    fn parse(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<Self::Output, ArgumentParseError>;

    /// Completion candidates for the token at `position`.
    ///
    /// `prior` holds the parsed values of the earlier positional arguments,
    /// `None` where an earlier token failed to parse. Callers filter the result
    /// by prefix, so implementations may return candidates that do not match
    /// `partial`.
    fn complete(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        let _ = (prior, partial, position, ctx);
        BTreeSet::new()
    }

    /// Whether the slot may be left empty when no token is supplied.
    fn is_optional(&self) -> bool {
        false
    }

    /// Runtime type of the values this parser produces.
    fn output_type(&self) -> TypeKey {
        TypeKey::of::<Self::Output>()
    }
}

/// Combinators available on every parser.
pub trait ArgumentParserExt: ArgumentParser + Sized {
    /// Same parser, but its slot may be left out.
    fn optional(self) -> OptionalOverride<Self> {
        self.with_optional(true)
    }

    /// Same parser with optionality forced to `optional`.
    fn with_optional(self, optional: bool) -> OptionalOverride<Self> {
        OptionalOverride::new(self, optional)
    }

    /// Replace completions with the supplier's output, evaluated per call.
    fn using_completions<F, I, S>(self, supplier: F) -> CompletionOverride<Self>
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompletionOverride::new(self, CompletionMode::Replace, supplier)
    }

    /// Add the supplier's output to the parser's own completions.
    fn add_completions<F, I, S>(self, supplier: F) -> CompletionOverride<Self>
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompletionOverride::new(self, CompletionMode::Augment, supplier)
    }

    /// Convert every successfully parsed value.
    fn map<U, F>(self, f: F) -> Transform<Self, U>
    where
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> U + Send + Sync + 'static,
    {
        Transform::new(self, move |value| Ok(f(value)))
    }

    /// Convert every successfully parsed value, possibly rejecting it.
    fn try_map<U, F>(self, f: F) -> Transform<Self, U>
    where
        U: Any + Send + Sync,
        F: Fn(Self::Output) -> Result<U, ArgumentParseError> + Send + Sync + 'static,
    {
        Transform::new(self, f)
    }

    /// Type-erase for storage in a command. Erasing an [`ErasedParser`]
    /// returns it unchanged.
    fn erase(self) -> ErasedParser {
        if let Some(erased) = (&self as &dyn Any).downcast_ref::<ErasedParser>() {
            return erased.clone();
        }
        ErasedParser(Arc::new(self))
    }
}

impl<P: ArgumentParser> ArgumentParserExt for P {}

trait DynParser: Send + Sync {
    fn parse_value(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<Value, ArgumentParseError>;

    fn complete_dyn(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String>;

    fn optional_dyn(&self) -> bool;

    fn output_type_dyn(&self) -> TypeKey;
}

impl<P: ArgumentParser> DynParser for P {
    fn parse_value(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<Value, ArgumentParseError> {
        let parsed = self.parse(token, position, ctx)?;
        Ok(Value::with_type(parsed, self.output_type()))
    }

    fn complete_dyn(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.complete(prior, partial, position, ctx)
    }

    fn optional_dyn(&self) -> bool {
        self.is_optional()
    }

    fn output_type_dyn(&self) -> TypeKey {
        self.output_type()
    }
}

/// A shared, type-erased parser.
#[derive(Clone)]
pub struct ErasedParser(Arc<dyn DynParser>);

impl ErasedParser {
    /// Whether both handles share one underlying parser.
    pub fn ptr_eq(&self, other: &ErasedParser) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl ArgumentParser for ErasedParser {
    type Output = Value;

    fn parse(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<Value, ArgumentParseError> {
        self.0.parse_value(token, position, ctx)
    }

    fn complete(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.0.complete_dyn(prior, partial, position, ctx)
    }

    fn is_optional(&self) -> bool {
        self.0.optional_dyn()
    }

    fn output_type(&self) -> TypeKey {
        self.0.output_type_dyn()
    }
}

impl fmt::Debug for ErasedParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedParser")
            .field("output", &self.output_type())
            .field("optional", &self.is_optional())
            .finish()
    }
}

/// Keep candidates that start with `partial`, comparing literally.
pub fn filter_prefix(candidates: BTreeSet<String>, partial: &str) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.starts_with(partial))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use crate::context::{CommandContext, CommandSender, Invocation, Location};
    use crate::output::Message;

    /// Sender recording every message it is sent.
    #[derive(Default)]
    pub struct RecordingSender {
        pub permissions: Vec<String>,
        pub interactive: bool,
        pub location: Option<Location>,
        pub messages: Mutex<Vec<Message>>,
    }

    impl RecordingSender {
        pub fn with_permissions(permissions: &[&str]) -> Self {
            Self {
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
                ..Self::default()
            }
        }

        pub fn take(&self) -> Vec<Message> {
            std::mem::take(&mut *self.messages.lock().expect("messages lock"))
        }
    }

    impl CommandSender for RecordingSender {
        fn name(&self) -> &str {
            "recorder"
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.permissions.iter().any(|p| p == permission)
        }

        fn is_interactive(&self) -> bool {
            self.interactive
        }

        fn location(&self) -> Option<Location> {
            self.location
        }

        fn send(&self, message: Message) {
            self.messages.lock().expect("messages lock").push(message);
        }
    }

    pub fn context_for(sender: Arc<RecordingSender>) -> CommandContext {
        let invocation = Invocation::new(sender, "test");
        CommandContext::new(&invocation, &[], "test")
    }

    pub fn ctx() -> CommandContext {
        context_for(Arc::new(RecordingSender::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ctx;
    use super::*;

    #[test]
    fn test_erase_is_idempotent() {
        let erased = IntegerArgument::new().erase();
        let again = erased.clone().erase();
        assert!(erased.ptr_eq(&again));
        assert_eq!(again.output_type(), TypeKey::of::<i32>());
    }

    #[test]
    fn test_erased_parse_keeps_type() {
        let erased = IntegerArgument::new().erase();
        let value = erased.parse("12", 0, &ctx()).expect("parse");
        assert_eq!(value.downcast_ref::<i32>(), Some(&12));
        assert_eq!(value.type_key(), &TypeKey::of::<i32>());
    }

    #[test]
    fn test_filter_prefix_is_literal() {
        let set: BTreeSet<String> = ["Add", "add", "sub"].iter().map(|s| s.to_string()).collect();
        assert_eq!(filter_prefix(set, "a"), vec!["add".to_string()]);
    }
}
