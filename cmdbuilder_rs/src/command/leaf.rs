use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use super::{DispatchOutcome, INTERNAL_ERROR_MESSAGE};
use crate::callback::{Arguments, CommandCallback};
use crate::context::{CommandContext, Invocation};
use crate::error::{CommandError, CommandParseError};
use crate::output::Message;
use crate::parser::{ArgumentParser, ErasedParser, filter_prefix};
use crate::value::Value;

/// A built leaf: ordered parsers, an optional variadic parser and a callback.
#[derive(Clone)]
pub struct LeafCommand(Arc<LeafInner>);

struct LeafInner {
    positional: Vec<ErasedParser>,
    variadic: Option<ErasedParser>,
    usage: Option<String>,
    callback: Arc<dyn CommandCallback>,
}

impl LeafCommand {
    pub(crate) fn new(
        positional: Vec<ErasedParser>,
        variadic: Option<ErasedParser>,
        usage: Option<String>,
        callback: Arc<dyn CommandCallback>,
    ) -> Self {
        Self(Arc::new(LeafInner {
            positional,
            variadic,
            usage,
            callback,
        }))
    }

    pub fn usage(&self) -> Option<&str> {
        self.0.usage.as_deref()
    }

    pub fn positional(&self) -> &[ErasedParser] {
        &self.0.positional
    }

    pub fn variadic(&self) -> Option<&ErasedParser> {
        self.0.variadic.as_ref()
    }

    /// Number of tokens that must be present: every slot up to the last
    /// non-optional one.
    pub fn required_arguments(&self) -> usize {
        self.0
            .positional
            .iter()
            .rposition(|parser| !parser.is_optional())
            .map_or(0, |index| index + 1)
    }

    fn resolved_usage(&self, invocation: &Invocation) -> String {
        self.0
            .usage
            .clone()
            .or_else(|| invocation.usage.clone())
            .unwrap_or_else(|| invocation.path.join(" "))
    }

    /// Parse `tokens` and run the callback.
    pub fn execute(&self, invocation: &Invocation, tokens: &[String]) -> DispatchOutcome {
        let ctx = CommandContext::new(invocation, tokens, self.resolved_usage(invocation));
        let callback = &self.0.callback;

        let args = match self.parse_arguments(tokens, &ctx) {
            Ok(args) => args,
            Err(cause) => {
                debug!(path = ?ctx.path, error = %cause, "argument parsing failed");
                callback.on_failure(&cause, &ctx);
                return DispatchOutcome::ParseFailed;
            }
        };

        match callback.on_success(args, &ctx) {
            Ok(()) => DispatchOutcome::Executed,
            Err(CommandError::Usage(cause)) => {
                callback.on_failure(&cause, &ctx);
                DispatchOutcome::ParseFailed
            }
            Err(CommandError::Rejected(message)) => {
                ctx.reply(Message::Error(message));
                DispatchOutcome::Rejected
            }
            Err(CommandError::Internal(err)) => {
                error!(
                    command = %ctx.command,
                    path = ?ctx.path,
                    sender = ctx.sender.name(),
                    "command callback failed: {err:#}"
                );
                ctx.reply(Message::Error(INTERNAL_ERROR_MESSAGE.to_string()));
                DispatchOutcome::InternalError
            }
        }
    }

    fn parse_arguments(
        &self,
        tokens: &[String],
        ctx: &CommandContext,
    ) -> Result<Arguments, CommandParseError> {
        let positional = &self.0.positional;
        let required = self.required_arguments();

        if tokens.len() < required {
            return Err(CommandParseError::new(format!(
                "too few arguments, expected at least {required} but found {}",
                tokens.len()
            )));
        }
        if self.0.variadic.is_none() && tokens.len() > positional.len() {
            return Err(CommandParseError::new(format!(
                "too many arguments, expected at most {} but found {}",
                positional.len(),
                tokens.len()
            )));
        }

        let mut values = Vec::with_capacity(positional.len());
        for (position, parser) in positional.iter().enumerate() {
            match tokens.get(position) {
                Some(token) => values.push(Some(parser.parse(token, position, ctx)?)),
                None => values.push(None),
            }
        }

        let variadic = match &self.0.variadic {
            Some(parser) => {
                let rest = tokens.get(positional.len()..).unwrap_or_default();
                let mut parsed = Vec::with_capacity(rest.len());
                for (offset, token) in rest.iter().enumerate() {
                    parsed.push(parser.parse(token, positional.len() + offset, ctx)?);
                }
                Some(parsed)
            }
            None => None,
        };

        Ok(Arguments::new(values, variadic))
    }

    fn parser_at(&self, position: usize) -> Option<&ErasedParser> {
        self.0
            .positional
            .get(position)
            .or(self.0.variadic.as_ref())
    }

    /// Completion candidates for the last token.
    ///
    /// Earlier tokens are parsed on a best-effort basis so the completing
    /// parser can see them. An empty token list completes an empty first token.
    pub fn complete(&self, invocation: &Invocation, tokens: &[String]) -> Vec<String> {
        let ctx = CommandContext::new(invocation, tokens, self.resolved_usage(invocation));
        let (partial, earlier) = match tokens.split_last() {
            Some((last, earlier)) => (last.as_str(), earlier),
            None => ("", &[][..]),
        };
        let position = earlier.len();

        let prior: Vec<Option<Value>> = earlier
            .iter()
            .enumerate()
            .map(|(index, token)| {
                self.parser_at(index)
                    .and_then(|parser| parser.parse(token, index, &ctx).ok())
            })
            .collect();

        match self.parser_at(position) {
            Some(parser) => filter_prefix(parser.complete(&prior, partial, position, &ctx), partial),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for LeafCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafCommand")
            .field("positional", &self.0.positional)
            .field("variadic", &self.0.variadic)
            .field("usage", &self.0.usage)
            .finish_non_exhaustive()
    }
}
