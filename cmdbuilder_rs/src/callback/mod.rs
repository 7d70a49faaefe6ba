//! Command callbacks.
//!
//! A leaf command hands its parsed values to a [`CommandCallback`]. Use
//! [`from_fn`] for a closure, or implement [`Executable`] and let
//! [`ExecutableCallback`] bind values to its declared parameters.

mod executable;

pub use executable::{Executable, ExecutableCallback, INTERACTIVE_ONLY_MESSAGE};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::context::CommandContext;
use crate::error::{BuildError, CommandError, CommandParseError};
use crate::output::Message;
use crate::parser::ErasedParser;
use crate::value::Value;

pub trait CommandCallback: Send + Sync {
    /// Every argument parsed. `args` holds one entry per positional parser,
    /// `None` for an omitted optional slot.
    fn on_success(&self, args: Arguments, ctx: &CommandContext) -> Result<(), CommandError>;

    /// Parsing failed, or `on_success` returned a usage error.
    fn on_failure(&self, cause: &CommandParseError, ctx: &CommandContext) {
        ctx.reply(Message::Error(format!("Incorrect command: {}", cause.message())));
        ctx.reply(Message::Usage(ctx.usage.clone()));
    }

    /// Validate the parsers a leaf is about to be built with.
    fn check_parsers(
        &self,
        positional: &[ErasedParser],
        variadic: Option<&ErasedParser>,
    ) -> Result<(), BuildError> {
        let _ = (positional, variadic);
        Ok(())
    }
}

impl<C: CommandCallback + ?Sized> CommandCallback for Arc<C> {
    fn on_success(&self, args: Arguments, ctx: &CommandContext) -> Result<(), CommandError> {
        (**self).on_success(args, ctx)
    }

    fn on_failure(&self, cause: &CommandParseError, ctx: &CommandContext) {
        (**self).on_failure(cause, ctx)
    }

    fn check_parsers(
        &self,
        positional: &[ErasedParser],
        variadic: Option<&ErasedParser>,
    ) -> Result<(), BuildError> {
        (**self).check_parsers(positional, variadic)
    }
}

/// Callback wrapping a closure.
pub struct FnCallback<F>(F);

pub fn from_fn<F>(f: F) -> FnCallback<F>
where
    F: Fn(Arguments, &CommandContext) -> Result<(), CommandError> + Send + Sync,
{
    FnCallback(f)
}

impl<F> CommandCallback for FnCallback<F>
where
    F: Fn(Arguments, &CommandContext) -> Result<(), CommandError> + Send + Sync,
{
    fn on_success(&self, args: Arguments, ctx: &CommandContext) -> Result<(), CommandError> {
        (self.0)(args, ctx)
    }
}

/// Parsed values of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Option<Value>>,
    variadic: Option<Vec<Value>>,
}

impl Arguments {
    pub fn new(values: Vec<Option<Value>>, variadic: Option<Vec<Value>>) -> Self {
        Self { values, variadic }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Values of the variadic parser. `None` when the command has no variadic
    /// parser, empty when it has one but no tokens were left for it.
    pub fn variadic_values(&self) -> Option<&[Value]> {
        self.variadic.as_deref()
    }

    /// The value at `index`, which must be present and of type `T`.
    pub fn get<T: Any + Clone>(&self, index: usize) -> Result<T, CommandError> {
        self.get_opt(index)?
            .ok_or_else(|| CommandError::Internal(anyhow!("argument {index} was omitted")))
    }

    /// The value at `index`, or `None` if its optional slot was left out.
    pub fn get_opt<T: Any + Clone>(&self, index: usize) -> Result<Option<T>, CommandError> {
        let slot = self
            .values
            .get(index)
            .ok_or_else(|| CommandError::Internal(anyhow!("no argument at index {index}")))?;
        match slot {
            None => Ok(None),
            Some(value) => downcast(value, index).map(Some),
        }
    }

    /// All variadic values as `T`.
    pub fn variadic<T: Any + Clone>(&self) -> Result<Vec<T>, CommandError> {
        let values = self
            .variadic
            .as_ref()
            .ok_or_else(|| CommandError::Internal(anyhow!("command has no variadic argument")))?;
        values
            .iter()
            .enumerate()
            .map(|(index, value)| downcast(value, self.values.len() + index))
            .collect()
    }
}

fn downcast<T: Any + Clone>(value: &Value, index: usize) -> Result<T, CommandError> {
    value.downcast_ref::<T>().cloned().ok_or_else(|| {
        CommandError::Internal(anyhow!(
            "argument {index} is {} but {} was requested",
            value.type_key(),
            std::any::type_name::<T>()
        ))
    })
}

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCallback")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parser::test_support::{RecordingSender, context_for};

    #[test]
    fn test_arguments_typed_access() {
        let args = Arguments::new(
            vec![Some(Value::new(3i32)), None],
            Some(vec![Value::new("a".to_string()), Value::new("b".to_string())]),
        );
        assert_eq!(args.get::<i32>(0).expect("int"), 3);
        assert_eq!(args.get_opt::<String>(1).expect("absent"), None);
        assert!(args.get::<String>(1).is_err());
        assert!(args.get::<String>(0).is_err());
        assert!(args.get::<i32>(5).is_err());
        assert_eq!(args.variadic::<String>().expect("variadic"), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_variadic_is_error() {
        let args = Arguments::new(vec![], None);
        assert!(matches!(
            args.variadic::<String>(),
            Err(CommandError::Internal(_))
        ));
    }

    #[test]
    fn test_default_failure_renders_error_and_usage() {
        let sender = Arc::new(RecordingSender::default());
        let mut ctx = context_for(Arc::clone(&sender));
        ctx.usage = "add <a> <b>".into();
        let callback = from_fn(|_, _| Ok(()));
        callback.on_failure(&CommandParseError::new("not a valid integer"), &ctx);
        assert_eq!(
            sender.take(),
            vec![
                Message::Error("Incorrect command: not a valid integer".into()),
                Message::Usage("add <a> <b>".into()),
            ]
        );
    }
}
