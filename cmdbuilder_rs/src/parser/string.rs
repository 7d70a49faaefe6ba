use std::collections::BTreeSet;

use super::{ArgumentParser, ArgumentParserExt};
use crate::context::CommandContext;
use crate::error::ArgumentParseError;
use crate::inference::ParserTag;
use crate::value::Value;

/// Accepts any token as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringArgument;

impl StringArgument {
    pub fn new() -> Self {
        Self
    }
}

impl ArgumentParser for StringArgument {
    type Output = String;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        _ctx: &CommandContext,
    ) -> Result<String, ArgumentParseError> {
        Ok(token.to_string())
    }
}

/// Accepts one of a fixed set of tokens, and completes to that set.
#[derive(Debug, Clone, Default)]
pub struct StringSetArgument {
    values: BTreeSet<String>,
}

impl StringSetArgument {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    /// Producer tag for a parameter that must be one of `values`.
    pub fn tag<I, S>(values: I) -> ParserTag
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parser = Self::new(values);
        let label = format!("StringSetArgument::tag({:?})", parser.values);
        ParserTag::producer(label, move |_| Ok(parser.clone().erase()))
    }
}

impl ArgumentParser for StringSetArgument {
    type Output = String;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        _ctx: &CommandContext,
    ) -> Result<String, ArgumentParseError> {
        if self.values.contains(token) {
            Ok(token.to_string())
        } else {
            let listed: Vec<&str> = self.values.iter().map(String::as_str).collect();
            Err(ArgumentParseError::new(format!(
                "expected one of [{}] but found '{token}'",
                listed.join(", ")
            )))
        }
    }

    fn complete(
        &self,
        _prior: &[Option<Value>],
        _partial: &str,
        _position: usize,
        _ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.values.clone()
    }
}
