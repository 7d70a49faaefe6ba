use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::ArgumentParser;
use crate::context::CommandContext;
use crate::error::ArgumentParseError;
use crate::value::{TypeKey, Value};

/// Forces `is_optional` to a fixed value.
#[derive(Debug, Clone)]
pub struct OptionalOverride<P> {
    base: P,
    optional: bool,
}

impl<P: ArgumentParser> OptionalOverride<P> {
    pub fn new(base: P, optional: bool) -> Self {
        Self { base, optional }
    }

    pub fn base(&self) -> &P {
        &self.base
    }
}

impl<P: ArgumentParser> ArgumentParser for OptionalOverride<P> {
    type Output = P::Output;

    fn parse(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<P::Output, ArgumentParseError> {
        self.base.parse(token, position, ctx)
    }

    fn complete(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.base.complete(prior, partial, position, ctx)
    }

    fn is_optional(&self) -> bool {
        self.optional
    }

    fn output_type(&self) -> TypeKey {
        self.base.output_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    /// Ignore the base parser's candidates.
    Replace,
    /// Union with the base parser's candidates.
    Augment,
}

type Supplier = Arc<dyn Fn() -> BTreeSet<String> + Send + Sync>;

/// Overrides completions with an external supplier, called on every
/// completion request.
#[derive(Clone)]
pub struct CompletionOverride<P> {
    base: P,
    mode: CompletionMode,
    supplier: Supplier,
}

impl<P: ArgumentParser> CompletionOverride<P> {
    pub fn new<F, I, S>(base: P, mode: CompletionMode, supplier: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base,
            mode,
            supplier: Arc::new(move || supplier().into_iter().map(Into::into).collect()),
        }
    }
}

impl<P: ArgumentParser> ArgumentParser for CompletionOverride<P> {
    type Output = P::Output;

    fn parse(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<P::Output, ArgumentParseError> {
        self.base.parse(token, position, ctx)
    }

    fn complete(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        let mut candidates = (self.supplier)();
        if self.mode == CompletionMode::Augment {
            candidates.extend(self.base.complete(prior, partial, position, ctx));
        }
        candidates
    }

    fn is_optional(&self) -> bool {
        self.base.is_optional()
    }

    fn output_type(&self) -> TypeKey {
        self.base.output_type()
    }
}

impl<P: fmt::Debug> fmt::Debug for CompletionOverride<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionOverride")
            .field("base", &self.base)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

type Conversion<T, U> = Arc<dyn Fn(T) -> Result<U, ArgumentParseError> + Send + Sync>;

/// Converts the base parser's values, possibly rejecting them.
pub struct Transform<P: ArgumentParser, U> {
    base: P,
    convert: Conversion<P::Output, U>,
    _output: PhantomData<fn() -> U>,
}

impl<P: ArgumentParser, U: Any + Send + Sync> Transform<P, U> {
    pub fn new<F>(base: P, convert: F) -> Self
    where
        F: Fn(P::Output) -> Result<U, ArgumentParseError> + Send + Sync + 'static,
    {
        Self {
            base,
            convert: Arc::new(convert),
            _output: PhantomData,
        }
    }
}

impl<P: ArgumentParser + Clone, U> Clone for Transform<P, U> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            convert: Arc::clone(&self.convert),
            _output: PhantomData,
        }
    }
}

impl<P: ArgumentParser, U: Any + Send + Sync> ArgumentParser for Transform<P, U> {
    type Output = U;

    fn parse(
        &self,
        token: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> Result<U, ArgumentParseError> {
        let value = self.base.parse(token, position, ctx)?;
        (self.convert)(value)
    }

    fn complete(
        &self,
        prior: &[Option<Value>],
        partial: &str,
        position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.base.complete(prior, partial, position, ctx)
    }

    fn is_optional(&self) -> bool {
        self.base.is_optional()
    }
}

impl<P: ArgumentParser + fmt::Debug, U> fmt::Debug for Transform<P, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("base", &self.base)
            .field("output", &std::any::type_name::<U>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::super::test_support::ctx;
    use super::super::{ArgumentParserExt, IntegerArgument, StringSetArgument};
    use super::*;

    #[test]
    fn test_optional_is_idempotent_and_overrides() {
        let once = IntegerArgument::new().optional();
        let twice = IntegerArgument::new().optional().optional();
        assert!(once.is_optional());
        assert!(twice.is_optional());
        assert_eq!(
            once.parse("4", 0, &ctx()).expect("once"),
            twice.parse("4", 0, &ctx()).expect("twice")
        );

        let forced_off = IntegerArgument::new().optional().with_optional(false);
        assert!(!forced_off.is_optional());
    }

    #[test]
    fn test_optional_keeps_output_type() {
        let erased = IntegerArgument::new().optional().erase();
        assert_eq!(erased.output_type(), TypeKey::of::<i32>());
        assert!(erased.is_optional());
    }

    #[test]
    fn test_using_completions_reevaluates_supplier() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let parser = StringSetArgument::new(["a", "b"]).using_completions(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            vec![format!("dyn{n}")]
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = parser.complete(&[], "", 0, &ctx());
        let second = parser.complete(&[], "", 0, &ctx());
        assert_eq!(first.into_iter().collect::<Vec<_>>(), vec!["dyn0"]);
        assert_eq!(second.into_iter().collect::<Vec<_>>(), vec!["dyn1"]);
    }

    #[test]
    fn test_add_completions_unions_base() {
        let parser = StringSetArgument::new(["a", "b"]).add_completions(|| ["c"]);
        let got: Vec<_> = parser.complete(&[], "", 0, &ctx()).into_iter().collect();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_try_map_can_reject_valid_tokens() {
        let even = IntegerArgument::new().try_map(|n| {
            if n % 2 == 0 {
                Ok(i64::from(n))
            } else {
                Err(ArgumentParseError::new("should be even"))
            }
        });
        assert_eq!(even.parse("8", 0, &ctx()), Ok(8i64));
        assert_eq!(
            even.parse("7", 0, &ctx()),
            Err(ArgumentParseError::new("should be even"))
        );
        assert_eq!(
            even.parse("x", 0, &ctx()),
            Err(ArgumentParseError::new("not a valid integer"))
        );
        assert_eq!(even.output_type(), TypeKey::of::<i64>());
    }
}
