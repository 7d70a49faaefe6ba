//! Parser tags: declarative per-parameter parser sources.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::InferenceContext;
use crate::error::BuildError;
use crate::parser::{ArgumentParser, ArgumentParserExt, ErasedParser};

/// Whether a tag creates a parser or modifies the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRole {
    Producer,
    Transformer,
}

/// A kind of parameter metadata the inference engine understands.
///
/// Producers receive `previous == None`. Transformers always receive the
/// parser resolved so far: the previous tag's output, or the default parser
/// for the parameter's type when the transformer comes first.
pub trait InferenceTag: fmt::Debug + Send + Sync {
    fn role(&self) -> TagRole;

    fn infer(
        &self,
        ctx: &InferenceContext<'_>,
        previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError>;
}

/// A tag attached to a [`Param`](crate::signature::Param).
#[derive(Clone)]
pub struct ParserTag(Arc<dyn InferenceTag>);

impl ParserTag {
    pub fn new(tag: impl InferenceTag + 'static) -> Self {
        Self(Arc::new(tag))
    }

    pub fn role(&self) -> TagRole {
        self.0.role()
    }

    pub fn infer(
        &self,
        ctx: &InferenceContext<'_>,
        previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        self.0.infer(ctx, previous)
    }

    /// Construct `P` with its `Default` implementation.
    pub fn class<P: ArgumentParser + Default>() -> Self {
        Self::new(ClassTag::<P>(PhantomData))
    }

    /// Use this exact parser.
    pub fn parser(parser: impl ArgumentParser) -> Self {
        Self::new(InstanceTag(parser.erase()))
    }

    /// Fetch the parser from a named method or field of the command's
    /// [`Members`](super::Members).
    pub fn member(name: impl Into<String>) -> Self {
        Self::new(MemberTag(name.into()))
    }

    /// Make the previous parser optional.
    pub fn optional() -> Self {
        Self::with_optional(true)
    }

    pub fn with_optional(optional: bool) -> Self {
        Self::new(OptionalTag(optional))
    }

    /// Replace the previous parser's completions.
    pub fn using_completions<F>(supplier: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        let supplier = Arc::new(supplier);
        Self::transformer("using_completions", move |_, previous| {
            let supplier = Arc::clone(&supplier);
            Ok(previous.using_completions(move || supplier()).erase())
        })
    }

    /// Add to the previous parser's completions.
    pub fn add_completions<F>(supplier: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        let supplier = Arc::new(supplier);
        Self::transformer("add_completions", move |_, previous| {
            let supplier = Arc::clone(&supplier);
            Ok(previous.add_completions(move || supplier()).erase())
        })
    }

    /// Custom producer backed by a closure.
    pub fn producer<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&InferenceContext<'_>) -> Result<ErasedParser, BuildError> + Send + Sync + 'static,
    {
        let factory: TagFactory = Box::new(move |ctx, _previous| factory(ctx));
        Self::new(FnTag {
            label: label.into(),
            role: TagRole::Producer,
            factory,
        })
    }

    /// Custom transformer backed by a closure.
    pub fn transformer<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&InferenceContext<'_>, ErasedParser) -> Result<ErasedParser, BuildError>
            + Send
            + Sync
            + 'static,
    {
        let label = label.into();
        let tag_label = label.clone();
        let factory: TagFactory = Box::new(move |ctx, previous| {
            let previous = previous.ok_or_else(|| ctx.tag_failed(&tag_label, "no previous parser"))?;
            factory(ctx, previous)
        });
        Self::new(FnTag {
            label,
            role: TagRole::Transformer,
            factory,
        })
    }
}

impl fmt::Debug for ParserTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct ClassTag<P>(PhantomData<fn() -> P>);

impl<P: ArgumentParser + Default> InferenceTag for ClassTag<P> {
    fn role(&self) -> TagRole {
        TagRole::Producer
    }

    fn infer(
        &self,
        _ctx: &InferenceContext<'_>,
        _previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        Ok(P::default().erase())
    }
}

impl<P> fmt::Debug for ClassTag<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class({})", std::any::type_name::<P>())
    }
}

#[derive(Debug)]
struct InstanceTag(ErasedParser);

impl InferenceTag for InstanceTag {
    fn role(&self) -> TagRole {
        TagRole::Producer
    }

    fn infer(
        &self,
        _ctx: &InferenceContext<'_>,
        _previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        Ok(self.0.clone())
    }
}

struct MemberTag(String);

impl InferenceTag for MemberTag {
    fn role(&self) -> TagRole {
        TagRole::Producer
    }

    fn infer(
        &self,
        ctx: &InferenceContext<'_>,
        _previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        ctx.members.resolve(&self.0)
    }
}

impl fmt::Debug for MemberTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member({})", self.0)
    }
}

struct OptionalTag(bool);

impl InferenceTag for OptionalTag {
    fn role(&self) -> TagRole {
        TagRole::Transformer
    }

    fn infer(
        &self,
        ctx: &InferenceContext<'_>,
        previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        let previous = previous.ok_or_else(|| ctx.tag_failed("optional", "no previous parser"))?;
        Ok(previous.with_optional(self.0).erase())
    }
}

impl fmt::Debug for OptionalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "optional({})", self.0)
    }
}

type TagFactory = Box<
    dyn Fn(&InferenceContext<'_>, Option<ErasedParser>) -> Result<ErasedParser, BuildError>
        + Send
        + Sync,
>;

struct FnTag {
    label: String,
    role: TagRole,
    factory: TagFactory,
}

impl InferenceTag for FnTag {
    fn role(&self) -> TagRole {
        self.role
    }

    fn infer(
        &self,
        ctx: &InferenceContext<'_>,
        previous: Option<ErasedParser>,
    ) -> Result<ErasedParser, BuildError> {
        (self.factory)(ctx, previous)
    }
}

impl fmt::Debug for FnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
