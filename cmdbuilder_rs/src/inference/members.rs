//! Named members an executable exposes to member tags.
//!
//! A [`Members`] table is an ordered list of scopes, the executable's own scope
//! first and inherited scopes after it. Lookup by name checks every method of a
//! scope, then every field of that scope, and only then moves on to the next
//! scope.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::BuildError;
use crate::parser::{ArgumentParser, ArgumentParserExt, ErasedParser};
use crate::value::Value;

type Getter = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone)]
struct Member {
    name: String,
    get: Getter,
}

#[derive(Clone)]
struct Scope {
    owner: String,
    methods: Vec<Member>,
    fields: Vec<Member>,
}

impl Scope {
    fn find(&self, name: &str) -> Option<&Member> {
        self.methods
            .iter()
            .chain(self.fields.iter())
            .find(|member| member.name == name)
    }
}

#[derive(Clone)]
pub struct Members {
    scopes: Vec<Scope>,
}

impl Members {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            scopes: vec![Scope {
                owner: owner.into(),
                methods: Vec::new(),
                fields: Vec::new(),
            }],
        }
    }

    /// Name of the type that owns the first scope.
    pub fn owner(&self) -> &str {
        self.scopes
            .first()
            .map(|scope| scope.owner.as_str())
            .unwrap_or_default()
    }

    /// A zero-argument method returning a parser. Called on every lookup.
    pub fn method<P, F>(self, name: impl Into<String>, f: F) -> Self
    where
        P: ArgumentParser,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.push_method(name, Arc::new(move || Ok(Value::new(f().erase()))))
    }

    /// A zero-argument method returning a parser that may fail.
    pub fn try_method<P, F>(self, name: impl Into<String>, f: F) -> Self
    where
        P: ArgumentParser,
        F: Fn() -> anyhow::Result<P> + Send + Sync + 'static,
    {
        self.push_method(name, Arc::new(move || Ok(Value::new(f()?.erase()))))
    }

    /// A method returning something other than a parser.
    pub fn value_method<V, F>(self, name: impl Into<String>, f: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.push_method(name, Arc::new(move || Ok(Value::new(f()))))
    }

    /// A field holding a parser.
    pub fn field(self, name: impl Into<String>, parser: impl ArgumentParser) -> Self {
        let value = Value::new(parser.erase());
        self.push_field(name, Arc::new(move || Ok(value.clone())))
    }

    /// A field holding something other than a parser.
    pub fn value_field<V: Any + Send + Sync>(self, name: impl Into<String>, value: V) -> Self {
        let value = Value::new(value);
        self.push_field(name, Arc::new(move || Ok(value.clone())))
    }

    /// Append `parent`'s scopes after this table's own.
    pub fn inherit(mut self, parent: Members) -> Self {
        self.scopes.extend(parent.scopes);
        self
    }

    /// Look a member up by name and return its parser.
    pub fn resolve(&self, name: &str) -> Result<ErasedParser, BuildError> {
        let Some((scope, member)) = self
            .scopes
            .iter()
            .find_map(|scope| scope.find(name).map(|member| (scope, member)))
        else {
            return Err(BuildError::MemberNotFound {
                owner: self.owner().to_string(),
                name: name.to_string(),
            });
        };

        let value = (member.get)().map_err(|error| BuildError::MemberFailed {
            owner: scope.owner.clone(),
            name: name.to_string(),
            reason: format!("{error:#}"),
        })?;

        value
            .downcast_ref::<ErasedParser>()
            .cloned()
            .ok_or_else(|| BuildError::MemberNotParser {
                owner: scope.owner.clone(),
                name: name.to_string(),
                found: value.type_key().name(),
            })
    }

    fn push_method(mut self, name: impl Into<String>, get: Getter) -> Self {
        if let Some(scope) = self.scopes.first_mut() {
            scope.methods.push(Member {
                name: name.into(),
                get,
            });
        }
        self
    }

    fn push_field(mut self, name: impl Into<String>, get: Getter) -> Self {
        if let Some(scope) = self.scopes.first_mut() {
            scope.fields.push(Member {
                name: name.into(),
                get,
            });
        }
        self
    }
}

impl fmt::Debug for Members {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for scope in &self.scopes {
            let methods: Vec<&str> = scope.methods.iter().map(|m| m.name.as_str()).collect();
            let fields: Vec<&str> = scope.fields.iter().map(|m| m.name.as_str()).collect();
            list.entry(&(scope.owner.as_str(), methods, fields));
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{IntegerArgument, StringArgument};
    use crate::value::TypeKey;

    #[test]
    fn test_method_wins_over_field_in_same_scope() {
        let members = Members::new("Own")
            .field("source", StringArgument)
            .method("source", IntegerArgument::new);
        let parser = members.resolve("source").expect("resolve");
        assert_eq!(parser.output_type(), TypeKey::of::<i32>());
    }

    #[test]
    fn test_own_scope_exhausted_before_inherited() {
        let parent = Members::new("Parent").method("source", IntegerArgument::new);
        let members = Members::new("Own")
            .field("source", StringArgument)
            .inherit(parent);
        let parser = members.resolve("source").expect("resolve");
        assert_eq!(parser.output_type(), TypeKey::of::<String>());
    }

    #[test]
    fn test_falls_back_to_inherited_scope() {
        let parent = Members::new("Parent").field("inherited", IntegerArgument::new());
        let members = Members::new("Own").inherit(parent);
        assert!(members.resolve("inherited").is_ok());
    }

    #[test]
    fn test_missing_member_names_owner() {
        let err = Members::new("Own").resolve("nope").expect_err("missing");
        assert!(matches!(
            err,
            BuildError::MemberNotFound { ref owner, ref name } if owner == "Own" && name == "nope"
        ));
    }

    #[test]
    fn test_non_parser_member_is_rejected() {
        let members = Members::new("Own").value_field("count", 3u8);
        let err = members.resolve("count").expect_err("not a parser");
        assert!(matches!(err, BuildError::MemberNotParser { found: "u8", .. }));
    }

    #[test]
    fn test_non_parser_method_shadows_parser_field() {
        let members = Members::new("Own")
            .field("limit", IntegerArgument::new())
            .value_method("limit", || 10i64);
        let err = members.resolve("limit").expect_err("method wins");
        assert!(matches!(err, BuildError::MemberNotParser { found: "i64", .. }));
    }

    #[test]
    fn test_failing_method_reports_reason() {
        let members = Members::new("Own")
            .try_method("broken", || -> anyhow::Result<StringArgument> {
                anyhow::bail!("database offline")
            });
        let err = members.resolve("broken").expect_err("fails");
        assert!(err.to_string().contains("database offline"));
    }
}
