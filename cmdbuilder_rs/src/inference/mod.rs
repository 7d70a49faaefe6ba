//! Argument inference.
//!
//! Derives a command's parsers from an executable's [`Signature`]. Each
//! parameter's tags are applied in declaration order:
//!
//! 1. The first tag may be a producer, which creates a parser. If it is a
//!    transformer instead, the default parser for the parameter's type seeds
//!    the chain, and without such a default the build fails.
//! 2. Every later tag must be a transformer, which wraps the parser so far.
//! 3. A parameter without tags uses the default parser for its type.
//!
//! A trailing variadic parameter yields the command's variadic parser.

mod defaults;
mod members;
mod tags;

pub use defaults::DefaultInferenceProvider;
pub use members::Members;
pub use tags::{InferenceTag, ParserTag, TagRole};

use tracing::debug;

use crate::error::BuildError;
use crate::parser::{ArgumentParser, ErasedParser};
use crate::signature::{Param, Signature};

/// What a tag factory knows about the parameter it is resolving.
#[derive(Debug)]
pub struct InferenceContext<'a> {
    /// Name of the executable's signature.
    pub method: &'a str,
    pub param: &'a Param,
    /// Position of the parameter, 0 being the first after the context.
    pub index: usize,
    pub members: &'a Members,
}

impl InferenceContext<'_> {
    /// Error for a tag that could not produce a parser.
    pub fn tag_failed(&self, tag: &str, reason: impl Into<String>) -> BuildError {
        BuildError::TagFailed {
            method: self.method.to_string(),
            param: self.param.name().to_string(),
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parsers inferred for a signature.
#[derive(Debug, Clone, Default)]
pub struct InferredArguments {
    pub positional: Vec<ErasedParser>,
    pub variadic: Option<ErasedParser>,
}

pub fn infer_arguments(
    signature: &Signature,
    members: &Members,
    defaults: &DefaultInferenceProvider,
) -> Result<InferredArguments, BuildError> {
    let params = signature.params();
    let mut inferred = InferredArguments::default();

    for (index, param) in params.iter().enumerate() {
        if param.is_variadic() && index + 1 != params.len() {
            return Err(BuildError::VariadicNotLast {
                method: signature.name().to_string(),
                param: param.name().to_string(),
            });
        }

        let ctx = InferenceContext {
            method: signature.name(),
            param,
            index,
            members,
        };
        let parser = infer_parameter(&ctx, defaults)?;
        debug!(
            method = signature.name(),
            param = param.name(),
            output = parser.output_type().name(),
            "inferred parser"
        );

        if param.is_variadic() {
            inferred.variadic = Some(parser);
        } else {
            inferred.positional.push(parser);
        }
    }

    Ok(inferred)
}

fn infer_parameter(
    ctx: &InferenceContext<'_>,
    defaults: &DefaultInferenceProvider,
) -> Result<ErasedParser, BuildError> {
    let param = ctx.param;
    let mut current: Option<ErasedParser> = None;

    for tag in param.tags() {
        match tag.role() {
            TagRole::Transformer if current.is_none() => {
                let seed = defaults.get(param.ty()).ok_or_else(|| {
                    BuildError::TransformerWithoutParser {
                        method: ctx.method.to_string(),
                        param: param.name().to_string(),
                        tag: format!("{tag:?}"),
                        ty: param.ty().name(),
                    }
                })?;
                current = Some(seed);
            }
            TagRole::Producer if current.is_some() => {
                return Err(BuildError::ProducerAfterPrevious {
                    method: ctx.method.to_string(),
                    param: param.name().to_string(),
                    tag: format!("{tag:?}"),
                });
            }
            _ => {}
        }
        current = Some(tag.infer(ctx, current.take())?);
    }

    match current {
        Some(parser) => Ok(parser),
        None => defaults
            .get(param.ty())
            .ok_or_else(|| BuildError::MissingParser {
                method: ctx.method.to_string(),
                param: param.name().to_string(),
                ty: param.ty().name(),
            }),
    }
}
