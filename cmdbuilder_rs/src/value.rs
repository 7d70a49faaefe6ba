//! Type-erased argument values and declared parameter types.
//!
//! Parsers produce concrete Rust values, but a command holds parsers of many
//! different output types in one ordered list. [`Value`] is the erased form
//! passed between the parsing pipeline and callbacks, and [`TypeKey`] is the
//! runtime identity used for default-parser lookup and binding checks.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Runtime identity of a declared parameter type or parser output type.
///
/// A key may name a parent type. Registering a default parser for a key also
/// fills in its ancestors that have no parser yet, and a value whose key lists
/// `P` as an ancestor can be bound to a parameter declared as `P`.
#[derive(Clone)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    parent: Option<Arc<TypeKey>>,
}

impl TypeKey {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            parent: None,
        }
    }

    /// Key accepting any value. Parameters declared with it skip type checks.
    pub fn dynamic() -> Self {
        Self::of::<Value>()
    }

    /// Attach `parent` as the direct ancestor of this key.
    pub fn with_parent(mut self, parent: TypeKey) -> Self {
        self.parent = Some(Arc::new(parent));
        self
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }

    pub fn is_dynamic(&self) -> bool {
        self.id == TypeId::of::<Value>()
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &TypeKey> {
        std::iter::successors(self.parent.as_deref(), |key| key.parent.as_deref())
    }

    /// Whether a value of type `found` can be bound where `self` is declared.
    pub fn accepts(&self, found: &TypeKey) -> bool {
        self.is_dynamic()
            || self.id == found.id
            || found.ancestors().any(|ancestor| ancestor.id == self.id)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A parsed argument with its runtime type.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    ty: TypeKey,
}

impl Value {
    /// Wrap `value`. Wrapping a `Value` returns it unchanged.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::with_type(value, TypeKey::of::<T>())
    }

    /// Wrap `value`, recording `ty` (which may carry ancestors) as its type.
    pub fn with_type<T: Any + Send + Sync>(value: T, ty: TypeKey) -> Self {
        let boxed: Box<dyn Any + Send + Sync> = Box::new(value);
        match boxed.downcast::<Value>() {
            Ok(existing) => *existing,
            Err(boxed) => Self {
                inner: Arc::from(boxed),
                ty,
            },
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.ty
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.ty.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Animal;
    struct Dog;

    #[test]
    fn test_value_roundtrip_downcast() {
        let value = Value::new(42i32);
        assert!(value.is::<i32>());
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));
        assert_eq!(value.downcast_ref::<String>(), None);
        assert_eq!(value.type_key(), &TypeKey::of::<i32>());
    }

    #[test]
    fn test_value_new_does_not_double_wrap() {
        let value = Value::new(Value::new("hi".to_string()));
        assert!(value.is::<String>());
        assert_eq!(value.type_key(), &TypeKey::of::<String>());
    }

    #[test]
    fn test_type_key_accepts_exact_ancestor_and_dynamic() {
        let dog = TypeKey::of::<Dog>().with_parent(TypeKey::of::<Animal>());
        assert!(TypeKey::of::<Dog>().accepts(&dog));
        assert!(TypeKey::of::<Animal>().accepts(&dog));
        assert!(!TypeKey::of::<Dog>().accepts(&TypeKey::of::<Animal>()));
        assert!(TypeKey::dynamic().accepts(&TypeKey::of::<u8>()));
        assert_eq!(dog.ancestors().count(), 1);
    }
}
