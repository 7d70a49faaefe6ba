//! Default parsers by declared parameter type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::BuildError;
use crate::parser::{
    ArgumentParser, ArgumentParserExt, ErasedParser, FloatArgument, IntegerArgument, StringArgument,
};
use crate::value::TypeKey;

static GLOBAL: Lazy<Arc<DefaultInferenceProvider>> =
    Lazy::new(|| Arc::new(DefaultInferenceProvider::builtin()));

/// Maps declared parameter types to the parser used when a parameter carries
/// no producer tag.
///
/// Builders share one provider through an `Arc`. Registering through a shared
/// handle forks it first, so registrations never leak into the parent or into
/// siblings.
#[derive(Clone, Default)]
pub struct DefaultInferenceProvider {
    parsers: HashMap<TypeId, ErasedParser>,
}

impl DefaultInferenceProvider {
    /// A provider with no defaults at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A provider seeded with the built-in defaults: `String`, `f32`, `f64`
    /// and `i32`.
    pub fn builtin() -> Self {
        let mut provider = Self::empty();
        provider.insert(TypeKey::of::<String>(), StringArgument.erase());
        provider.insert(TypeKey::of::<f32>(), FloatArgument::new().erase());
        provider.insert(
            TypeKey::of::<f64>(),
            FloatArgument::new().map(f64::from).erase(),
        );
        provider.insert(TypeKey::of::<i32>(), IntegerArgument::new().erase());
        provider
    }

    /// The process-wide provider holding the built-in defaults.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Register `parser` as the default for `ty`.
    ///
    /// Replaces any existing default for `ty`, and also becomes the default for
    /// each ancestor of `ty` up to the first one that already has a default.
    pub fn register(
        &mut self,
        ty: TypeKey,
        parser: impl ArgumentParser,
    ) -> Result<&mut Self, BuildError> {
        if ty.is_unit() {
            return Err(BuildError::UnitDefault);
        }
        debug!(ty = ty.name(), "registering default parser");
        self.insert(ty, parser.erase());
        Ok(self)
    }

    /// [`register`](Self::register) keyed by `T` with no ancestors.
    pub fn register_type<T: Any>(
        &mut self,
        parser: impl ArgumentParser,
    ) -> Result<&mut Self, BuildError> {
        self.register(TypeKey::of::<T>(), parser)
    }

    pub fn get(&self, ty: &TypeKey) -> Option<ErasedParser> {
        self.parsers.get(&ty.id()).cloned()
    }

    /// An independent copy.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    fn insert(&mut self, ty: TypeKey, parser: ErasedParser) {
        for ancestor in ty.ancestors() {
            if self.parsers.contains_key(&ancestor.id()) {
                break;
            }
            self.parsers.insert(ancestor.id(), parser.clone());
        }
        self.parsers.insert(ty.id(), parser);
    }
}

impl fmt::Debug for DefaultInferenceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultInferenceProvider")
            .field("defaults", &self.parsers.len())
            .finish()
    }
}
