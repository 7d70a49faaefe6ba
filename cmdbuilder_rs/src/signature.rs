//! Declared parameters of an executable.
//!
//! A [`Signature`] describes the arguments an [`Executable`] takes after the
//! implicit context, in order. The inference engine reads it to build the
//! command's parsers, and the callback adapter checks parsed values against it.
//!
//! [`Executable`]: crate::callback::Executable

use std::any::Any;

use crate::inference::ParserTag;
use crate::value::TypeKey;

#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: TypeKey,
    nullable: bool,
    variadic: bool,
    tags: Vec<ParserTag>,
}

impl Param {
    /// A required parameter of type `T`.
    pub fn new<T: Any>(name: impl Into<String>) -> Self {
        Self::of_type(name, TypeKey::of::<T>())
    }

    pub fn of_type(name: impl Into<String>, ty: TypeKey) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            variadic: false,
            tags: Vec::new(),
        }
    }

    /// A parameter of type `T` that may be absent, read with
    /// [`Arguments::get_opt`](crate::callback::Arguments::get_opt).
    pub fn optional<T: Any>(name: impl Into<String>) -> Self {
        Self::new::<T>(name).nullable()
    }

    /// A trailing parameter collecting zero or more values of type `T`.
    pub fn variadic<T: Any>(name: impl Into<String>) -> Self {
        Self {
            variadic: true,
            ..Self::new::<T>(name)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Append a parser tag. Tags are applied in the order they are added.
    pub fn tag(mut self, tag: ParserTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type. For variadic parameters, the element type.
    pub fn ty(&self) -> &TypeKey {
        &self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn tags(&self) -> &[ParserTag] {
        &self.tags
    }
}

#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    params: Vec<Param>,
    interactive_only: bool,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            interactive_only: false,
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Only interactive senders may run the command.
    pub fn interactive_only(mut self) -> Self {
        self.interactive_only = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_interactive_only(&self) -> bool {
        self.interactive_only
    }

    /// The trailing variadic parameter, if the signature ends with one.
    pub fn variadic_param(&self) -> Option<&Param> {
        self.params.last().filter(|param| param.is_variadic())
    }

    /// Parameters bound positionally, i.e. all but a trailing variadic one.
    pub fn positional_params(&self) -> &[Param] {
        match self.variadic_param() {
            Some(_) => &self.params[..self.params.len() - 1],
            None => &self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_excludes_trailing_variadic() {
        let signature = Signature::new("execute")
            .param(Param::new::<i32>("first"))
            .param(Param::variadic::<String>("rest"));
        assert_eq!(signature.positional_params().len(), 1);
        assert_eq!(signature.variadic_param().map(Param::name), Some("rest"));
    }

    #[test]
    fn test_optional_param_is_nullable() {
        let param = Param::optional::<f32>("scale");
        assert!(param.is_nullable());
        assert!(!param.is_variadic());
        assert_eq!(param.ty(), &TypeKey::of::<f32>());
    }
}
