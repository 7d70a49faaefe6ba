use std::sync::Arc;

use tracing::debug;

use super::leaf::LeafCommand;
use crate::callback::{CommandCallback, Executable};
use crate::error::BuildError;
use crate::inference::{DefaultInferenceProvider, infer_arguments};
use crate::parser::{ArgumentParser, ArgumentParserExt, ErasedParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// A variadic parser was set. Nothing more can be added.
    Variadic,
    /// Arguments came from inference. Nothing more can be added.
    Inferred,
}

/// Accumulates the parsers of a leaf command.
///
/// Positional parsers are matched to tokens in the order they are added. At
/// most one variadic parser may follow them. [`infer`](Self::infer) derives
/// the whole list from an executable and cannot be mixed with manual calls.
pub struct CommandBuilder {
    arguments: Vec<ErasedParser>,
    variadic: Option<ErasedParser>,
    usage: Option<String>,
    state: State,
    defaults: Arc<DefaultInferenceProvider>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    /// A builder inferring from the global defaults.
    pub fn new() -> Self {
        Self::with_defaults(DefaultInferenceProvider::global())
    }

    pub fn with_defaults(defaults: Arc<DefaultInferenceProvider>) -> Self {
        Self {
            arguments: Vec::new(),
            variadic: None,
            usage: None,
            state: State::Open,
            defaults,
        }
    }

    /// Defaults used by [`infer`](Self::infer). Registering through this
    /// forks a shared provider first.
    pub fn defaults_mut(&mut self) -> &mut DefaultInferenceProvider {
        Arc::make_mut(&mut self.defaults)
    }

    pub fn argument(&mut self, parser: impl ArgumentParser) -> Result<&mut Self, BuildError> {
        self.ensure_open()?;
        self.arguments.push(parser.erase());
        Ok(self)
    }

    pub fn variadic_argument(
        &mut self,
        parser: impl ArgumentParser,
    ) -> Result<&mut Self, BuildError> {
        self.ensure_open()?;
        self.variadic = Some(parser.erase());
        self.state = State::Variadic;
        Ok(self)
    }

    /// Derive every parser from `target`'s signature.
    pub fn infer<E: Executable + ?Sized>(&mut self, target: &E) -> Result<&mut Self, BuildError> {
        if !self.arguments.is_empty() || self.variadic.is_some() {
            return Err(BuildError::ArgumentsAlreadyAdded);
        }
        self.ensure_open()?;

        let signature = target.signature();
        let inferred = infer_arguments(&signature, &target.members(), &self.defaults)?;
        debug!(
            method = signature.name(),
            positional = inferred.positional.len(),
            variadic = inferred.variadic.is_some(),
            "inferred command arguments"
        );

        self.arguments = inferred.positional;
        self.variadic = inferred.variadic;
        self.state = State::Inferred;
        Ok(self)
    }

    pub fn usage_message(&mut self, usage: impl Into<String>) -> &mut Self {
        self.usage = Some(usage.into());
        self
    }

    /// Freeze the configuration into a leaf calling `callback`.
    ///
    /// The callback checks the parsers first, so a mismatch between parsers
    /// and the callback's parameters fails here rather than on first use.
    pub fn build(self, callback: impl CommandCallback + 'static) -> Result<LeafCommand, BuildError> {
        callback.check_parsers(&self.arguments, self.variadic.as_ref())?;
        Ok(LeafCommand::new(
            self.arguments,
            self.variadic,
            self.usage,
            Arc::new(callback),
        ))
    }

    fn ensure_open(&self) -> Result<(), BuildError> {
        match self.state {
            State::Open => Ok(()),
            State::Variadic | State::Inferred => Err(BuildError::ArgumentsClosed),
        }
    }
}
