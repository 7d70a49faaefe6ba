use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Arguments, CommandCallback};
use crate::context::CommandContext;
use crate::error::{BuildError, CommandError};
use crate::inference::Members;
use crate::parser::{ArgumentParser, ErasedParser};
use crate::signature::{Param, Signature};
use crate::value::TypeKey;

pub const INTERACTIVE_ONLY_MESSAGE: &str = "Only interactive senders can use this command";

/// Application logic with declared parameters.
///
/// The signature drives argument inference and is checked against every
/// invocation's values before `execute` runs, so `execute` can read its
/// arguments by index without re-validating them.
pub trait Executable: Send + Sync + 'static {
    fn signature(&self) -> Signature;

    /// Members available to member tags.
    fn members(&self) -> Members {
        Members::new(std::any::type_name::<Self>())
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError>;
}

/// Binds parsed values to an [`Executable`]'s parameters.
pub struct ExecutableCallback<E: ?Sized> {
    target: Arc<E>,
    signature: Signature,
}

impl<E: Executable> ExecutableCallback<E> {
    pub fn new(target: E) -> Self {
        Self::from_arc(Arc::new(target))
    }
}

impl<E: Executable + ?Sized> ExecutableCallback<E> {
    pub fn from_arc(target: Arc<E>) -> Self {
        let signature = target.signature();
        Self { target, signature }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    fn check_arguments(&self, args: &Arguments) -> Result<(), BuildError> {
        let method = self.signature.name();
        let params = self.signature.positional_params();

        if params.len() != args.len() {
            return Err(BuildError::ArityMismatch {
                method: method.to_string(),
                expected: params.len(),
                found: args.len(),
            });
        }

        for (param, value) in params.iter().zip(args.values()) {
            match value {
                None if !param.is_nullable() => {
                    return Err(BuildError::NullToNonNullable {
                        method: method.to_string(),
                        param: param.name().to_string(),
                        ty: param.ty().name(),
                    });
                }
                None => {}
                Some(value) => check_assignable(method, param, value.type_key())?,
            }
        }

        match (self.signature.variadic_param(), args.variadic_values()) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(BuildError::UnexpectedVariadic {
                method: method.to_string(),
            }),
            (Some(_), None) => Err(BuildError::MissingVariadic {
                method: method.to_string(),
            }),
            (Some(param), Some(values)) => values
                .iter()
                .try_for_each(|value| check_assignable(method, param, value.type_key())),
        }
    }
}

fn check_assignable(method: &str, param: &Param, found: &TypeKey) -> Result<(), BuildError> {
    if param.ty().accepts(found) {
        Ok(())
    } else {
        Err(BuildError::ValueTypeMismatch {
            method: method.to_string(),
            param: param.name().to_string(),
            expected: param.ty().name(),
            found: found.name(),
        })
    }
}

fn check_parser(method: &str, param: &Param, parser: &ErasedParser) -> Result<(), BuildError> {
    let found = parser.output_type();
    if !param.ty().accepts(&found) {
        return Err(BuildError::ParserTypeMismatch {
            method: method.to_string(),
            param: param.name().to_string(),
            expected: param.ty().name(),
            found: found.name(),
        });
    }
    if parser.is_optional() && !param.is_nullable() && !param.is_variadic() {
        return Err(BuildError::OptionalIntoNonNullable {
            method: method.to_string(),
            param: param.name().to_string(),
        });
    }
    Ok(())
}

impl<E: Executable + ?Sized> CommandCallback for ExecutableCallback<E> {
    fn on_success(&self, args: Arguments, ctx: &CommandContext) -> Result<(), CommandError> {
        if self.signature.is_interactive_only() && !ctx.sender.is_interactive() {
            debug!(
                sender = ctx.sender.name(),
                command = %ctx.command,
                "rejected non-interactive sender"
            );
            return Err(CommandError::Rejected(INTERACTIVE_ONLY_MESSAGE.to_string()));
        }

        self.check_arguments(&args)?;
        self.target.execute(ctx, args)
    }

    fn check_parsers(
        &self,
        positional: &[ErasedParser],
        variadic: Option<&ErasedParser>,
    ) -> Result<(), BuildError> {
        let method = self.signature.name();
        let params = self.signature.positional_params();

        if params.len() != positional.len() {
            return Err(BuildError::ArityMismatch {
                method: method.to_string(),
                expected: params.len(),
                found: positional.len(),
            });
        }
        for (param, parser) in params.iter().zip(positional) {
            check_parser(method, param, parser)?;
        }

        match (self.signature.variadic_param(), variadic) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(BuildError::UnexpectedVariadic {
                method: method.to_string(),
            }),
            (Some(_), None) => Err(BuildError::MissingVariadic {
                method: method.to_string(),
            }),
            (Some(param), Some(parser)) => check_parser(method, param, parser),
        }
    }
}

impl<E: ?Sized> fmt::Debug for ExecutableCallback<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableCallback")
            .field("signature", &self.signature.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::parser::test_support::{RecordingSender, context_for};
    use crate::parser::{ArgumentParserExt, IntegerArgument, StringArgument};
    use crate::value::Value;

    #[derive(Default)]
    struct Greet {
        seen: Mutex<Vec<String>>,
    }

    impl Executable for Greet {
        fn signature(&self) -> Signature {
            Signature::new("greet")
                .param(Param::new::<String>("name"))
                .param(Param::optional::<i32>("times"))
        }

        fn execute(&self, _ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
            let name: String = args.get(0)?;
            let times = args.get_opt::<i32>(1)?.unwrap_or(1);
            self.seen
                .lock()
                .expect("seen lock")
                .push(format!("{name}x{times}"));
            Ok(())
        }
    }

    struct Secret;

    impl Executable for Secret {
        fn signature(&self) -> Signature {
            Signature::new("secret").interactive_only()
        }

        fn execute(&self, _ctx: &CommandContext, _args: Arguments) -> Result<(), CommandError> {
            Ok(())
        }
    }

    fn ctx() -> CommandContext {
        context_for(Arc::new(RecordingSender::default()))
    }

    #[test]
    fn test_binds_values_positionally() {
        let target = Arc::new(Greet::default());
        let callback = ExecutableCallback::from_arc(Arc::clone(&target));
        callback
            .on_success(
                Arguments::new(vec![Some(Value::new("ann".to_string())), None], None),
                &ctx(),
            )
            .expect("success");
        assert_eq!(*target.seen.lock().expect("seen lock"), vec!["annx1"]);
    }

    #[test]
    fn test_arity_mismatch_is_internal() {
        let callback = ExecutableCallback::new(Greet::default());
        let err = callback
            .on_success(Arguments::new(vec![Some(Value::new("ann".to_string()))], None), &ctx())
            .expect_err("arity");
        assert!(matches!(err, CommandError::Internal(_)));
    }

    #[test]
    fn test_null_into_non_nullable_is_rejected() {
        let callback = ExecutableCallback::new(Greet::default());
        let err = callback
            .check_arguments(&Arguments::new(vec![None, None], None))
            .expect_err("null");
        assert!(matches!(err, BuildError::NullToNonNullable { .. }));
    }

    #[test]
    fn test_value_type_mismatch() {
        let callback = ExecutableCallback::new(Greet::default());
        let err = callback
            .check_arguments(&Arguments::new(
                vec![Some(Value::new(1i32)), None],
                None,
            ))
            .expect_err("type");
        assert!(matches!(err, BuildError::ValueTypeMismatch { .. }));
    }

    #[test]
    fn test_variadic_consistency() {
        let callback = ExecutableCallback::new(Greet::default());
        let err = callback
            .check_arguments(&Arguments::new(
                vec![Some(Value::new("a".to_string())), None],
                Some(vec![]),
            ))
            .expect_err("unexpected variadic");
        assert!(matches!(err, BuildError::UnexpectedVariadic { .. }));
    }

    #[test]
    fn test_interactive_only_checked_before_binding() {
        let callback = ExecutableCallback::new(Secret);
        // Wrong arity on purpose: the rejection must come first.
        let err = callback
            .on_success(Arguments::new(vec![None], None), &ctx())
            .expect_err("rejected");
        assert!(
            matches!(err, CommandError::Rejected(ref message) if message == INTERACTIVE_ONLY_MESSAGE)
        );

        let interactive = context_for(Arc::new(RecordingSender {
            interactive: true,
            ..RecordingSender::default()
        }));
        assert!(
            callback
                .on_success(Arguments::default(), &interactive)
                .is_ok()
        );
    }

    #[test]
    fn test_check_parsers_eagerly() {
        let callback = ExecutableCallback::new(Greet::default());
        let ok = [StringArgument.erase(), IntegerArgument::new().optional().erase()];
        assert!(callback.check_parsers(&ok, None).is_ok());

        let wrong_type = [IntegerArgument::new().erase(), IntegerArgument::new().erase()];
        assert!(matches!(
            callback.check_parsers(&wrong_type, None),
            Err(BuildError::ParserTypeMismatch { .. })
        ));

        let optional_first = [StringArgument.optional().erase(), IntegerArgument::new().erase()];
        assert!(matches!(
            callback.check_parsers(&optional_first, None),
            Err(BuildError::OptionalIntoNonNullable { .. })
        ));

        assert!(matches!(
            callback.check_parsers(&ok, Some(&StringArgument.erase())),
            Err(BuildError::UnexpectedVariadic { .. })
        ));
    }
}
