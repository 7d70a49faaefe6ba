//! Host command table and the dispatch boundary.
//!
//! The host declares its root commands (usually from the metadata file) and
//! attaches a built tree to each. [`CommandRegistry::dispatch`] is the only
//! entry point the host calls per line of input; nothing a tree does can
//! unwind past it.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::command::{
    CommandNode, CompositeCommandBuilder, CompositeTopLevelCommand, DispatchOutcome,
    INTERNAL_ERROR_MESSAGE, TopLevelCommand, build_composite_top_level_with, build_top_level,
    validate_name,
};
use crate::context::{CommandSender, Invocation};
use crate::error::BuildError;
use crate::inference::DefaultInferenceProvider;
use crate::metadata::MetadataFile;
use crate::output::Message;
use crate::parser::filter_prefix;

pub const NO_PERMISSION_MESSAGE: &str = "You do not have permission to perform this command";

#[derive(Default)]
struct HostCommand {
    usage: Option<String>,
    permission: Option<String>,
    node: Option<CommandNode>,
}

/// Root commands declared by the host and the trees attached to them.
pub struct CommandRegistry {
    commands: BTreeMap<String, HostCommand>,
    metadata: MetadataFile,
    defaults: Arc<DefaultInferenceProvider>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(MetadataFile::default())
    }
}

impl CommandRegistry {
    /// Declares every top-level command in `metadata`.
    pub fn new(metadata: MetadataFile) -> Self {
        let commands = metadata
            .commands
            .iter()
            .map(|(name, entry)| {
                let command = HostCommand {
                    usage: entry.usage.clone().filter(|usage| !usage.trim().is_empty()),
                    permission: entry.permission.clone(),
                    node: None,
                };
                (name.clone(), command)
            })
            .collect();

        Self {
            commands,
            metadata,
            defaults: DefaultInferenceProvider::global(),
        }
    }

    pub fn with_defaults(mut self, defaults: Arc<DefaultInferenceProvider>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &Arc<DefaultInferenceProvider> {
        &self.defaults
    }

    pub fn metadata(&self) -> &MetadataFile {
        &self.metadata
    }

    /// Declare a root command that isn't in the metadata.
    pub fn declare(&mut self, name: &str, usage: Option<String>) -> Result<&mut Self, BuildError> {
        validate_name(name)?;
        let command = self.commands.entry(name.to_string()).or_default();
        if usage.is_some() {
            command.usage = usage;
        }
        Ok(self)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn is_attached(&self, name: &str) -> bool {
        self.commands
            .get(name)
            .is_some_and(|command| command.node.is_some())
    }

    pub fn usage(&self, name: &str) -> Option<&str> {
        self.commands.get(name)?.usage.as_deref()
    }

    /// Names of the root commands that have a tree.
    pub fn attached(&self) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .filter(|(_, command)| command.node.is_some())
            .map(|(name, _)| name.as_str())
    }

    /// Attach `node` to the declared command `name`.
    ///
    /// A composite attached to a command without a usage gets
    /// `<name> <child|...>` as its usage.
    pub fn attach(&mut self, name: &str, node: impl Into<CommandNode>) -> Result<(), BuildError> {
        let node = node.into();
        let command = self
            .commands
            .get_mut(name)
            .ok_or_else(|| BuildError::UnknownHostCommand {
                name: name.to_string(),
            })?;
        if command.node.is_some() {
            return Err(BuildError::HandlerAlreadyAttached {
                name: name.to_string(),
            });
        }

        if let (None, CommandNode::Composite(composite)) = (&command.usage, &node) {
            command.usage = Some(composite.default_usage(name));
        }
        info!(command = name, composite = node.is_composite(), "attached command");
        command.node = Some(node);
        Ok(())
    }

    pub fn attach_top_level(&mut self, command: Arc<dyn TopLevelCommand>) -> Result<(), BuildError> {
        let name = command.name().to_string();
        self.ensure_attachable(&name)?;
        let leaf = build_top_level(command, Arc::clone(&self.defaults))?;
        self.attach(&name, leaf)
    }

    pub fn attach_composite_top_level(
        &mut self,
        command: &dyn CompositeTopLevelCommand,
    ) -> Result<(), BuildError> {
        self.attach_composite_top_level_with(command, |_| Ok(()))
    }

    pub(crate) fn attach_composite_top_level_with<F>(
        &mut self,
        command: &dyn CompositeTopLevelCommand,
        extend: F,
    ) -> Result<(), BuildError>
    where
        F: FnOnce(&mut CompositeCommandBuilder) -> Result<(), BuildError>,
    {
        let name = command.name().to_string();
        self.ensure_attachable(&name)?;
        let metadata = self.metadata.command(&name).cloned().unwrap_or_default();
        let composite =
            build_composite_top_level_with(command, metadata, Arc::clone(&self.defaults), extend)?;
        self.attach(&name, composite)
    }

    fn ensure_attachable(&self, name: &str) -> Result<(), BuildError> {
        match self.commands.get(name) {
            None => Err(BuildError::UnknownHostCommand {
                name: name.to_string(),
            }),
            Some(command) if command.node.is_some() => Err(BuildError::HandlerAlreadyAttached {
                name: name.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Route one tokenized line, root command first.
    ///
    /// Every outcome is reported to `sender`. Panics raised by parsers or
    /// callbacks are logged and answered with a generic internal error.
    pub fn dispatch(&self, sender: Arc<dyn CommandSender>, tokens: &[String]) -> DispatchOutcome {
        let Some((name, rest)) = tokens.split_first() else {
            return DispatchOutcome::EmptyInvocation;
        };

        let Some((command, node)) = self
            .commands
            .get(name.as_str())
            .and_then(|command| command.node.as_ref().map(|node| (command, node)))
        else {
            sender.send(Message::Error(format!("unknown command '{name}'")));
            return DispatchOutcome::NoSuchSubcommand;
        };

        let permitted = command
            .permission
            .as_deref()
            .is_none_or(|permission| sender.has_permission(permission));
        if !permitted {
            debug!(command = %name, sender = sender.name(), "missing host permission");
            sender.send(Message::Error(NO_PERMISSION_MESSAGE.to_string()));
            return DispatchOutcome::Rejected;
        }

        let invocation = Invocation::new(Arc::clone(&sender), name.as_str())
            .with_usage(command.usage.clone());
        match catch_unwind(AssertUnwindSafe(|| node.dispatch(&invocation, rest))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                error!(
                    command = %name,
                    tokens = ?rest,
                    panic = panic_message(payload.as_ref()),
                    "command panicked"
                );
                sender.send(Message::Error(INTERNAL_ERROR_MESSAGE.to_string()));
                DispatchOutcome::InternalError
            }
        }
    }

    /// Candidates for the last of `tokens`. With one token or none, the
    /// attached root commands the sender may use.
    pub fn complete(&self, sender: Arc<dyn CommandSender>, tokens: &[String]) -> Vec<String> {
        let permitted = |command: &HostCommand| {
            command.node.is_some()
                && command
                    .permission
                    .as_deref()
                    .is_none_or(|permission| sender.has_permission(permission))
        };

        match tokens {
            [] | [_] => {
                let partial = tokens.first().map(String::as_str).unwrap_or("");
                let names = self
                    .commands
                    .iter()
                    .filter(|(_, command)| permitted(command))
                    .map(|(name, _)| name.clone())
                    .collect();
                filter_prefix(names, partial)
            }
            [name, rest @ ..] => {
                let Some(command) = self.commands.get(name.as_str()).filter(|c| permitted(*c)) else {
                    return Vec::new();
                };
                let Some(node) = &command.node else {
                    return Vec::new();
                };
                let invocation = Invocation::new(Arc::clone(&sender), name.as_str())
                    .with_usage(command.usage.clone());
                catch_unwind(AssertUnwindSafe(|| node.complete(&invocation, rest))).unwrap_or_else(
                    |payload| {
                        error!(
                            command = %name,
                            panic = panic_message(payload.as_ref()),
                            "completion panicked"
                        );
                        Vec::new()
                    },
                )
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::from_fn;
    use crate::command::{CommandBuilder, CompositeCommandBuilder};
    use crate::parser::test_support::RecordingSender;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn registry() -> CommandRegistry {
        let metadata = MetadataFile::from_toml_str(
            r#"
[commands.calc]
description = "Calculator"

[commands.boom]
usage = "boom"

[commands.vault]
usage = "vault"
permission = "vault.open"
"#,
        )
        .expect("metadata");
        let mut registry = CommandRegistry::new(metadata);

        let mut calc = CompositeCommandBuilder::new();
        calc.command(
            "add",
            "Add",
            "add",
            |_: &mut CommandBuilder| Ok(()),
            from_fn(|_, _| Ok(())),
        )
        .expect("add");
        registry.attach("calc", calc.build()).expect("calc");

        let boom = CommandBuilder::new()
            .build(from_fn(|_, _| panic!("kaboom")))
            .expect("boom");
        registry.attach("boom", boom).expect("boom");

        let vault = CommandBuilder::new()
            .build(from_fn(|_, _| Ok(())))
            .expect("vault");
        registry.attach("vault", vault).expect("vault");
        registry
    }

    #[test]
    fn test_composite_gets_default_usage() {
        let registry = registry();
        assert_eq!(registry.usage("calc"), Some("calc <add|help>"));
        assert_eq!(registry.usage("boom"), Some("boom"));
    }

    #[test]
    fn test_attach_requires_declaration_and_is_single_shot() {
        let mut registry = registry();
        let leaf = CommandBuilder::new()
            .build(from_fn(|_, _| Ok(())))
            .expect("leaf");
        assert!(matches!(
            registry.attach("nope", leaf.clone()),
            Err(BuildError::UnknownHostCommand { .. })
        ));
        assert!(matches!(
            registry.attach("boom", leaf.clone()),
            Err(BuildError::HandlerAlreadyAttached { .. })
        ));

        registry.declare("late", None).expect("declare");
        registry.attach("late", leaf).expect("late");
        assert!(registry.is_attached("late"));
    }

    #[test]
    fn test_panics_stay_inside_the_boundary() {
        let registry = registry();
        let sender = Arc::new(RecordingSender::default());
        let outcome = registry.dispatch(sender.clone(), &tokens(&["boom"]));
        assert_eq!(outcome, DispatchOutcome::InternalError);
        assert_eq!(
            sender.take(),
            vec![Message::Error(INTERNAL_ERROR_MESSAGE.into())]
        );
    }

    #[test]
    fn test_unknown_root_command() {
        let registry = registry();
        let sender = Arc::new(RecordingSender::default());
        assert_eq!(
            registry.dispatch(sender.clone(), &tokens(&["nope"])),
            DispatchOutcome::NoSuchSubcommand
        );
        assert_eq!(
            sender.take(),
            vec![Message::Error("unknown command 'nope'".into())]
        );
        assert_eq!(
            registry.dispatch(sender.clone(), &[]),
            DispatchOutcome::EmptyInvocation
        );
    }

    #[test]
    fn test_host_permission_gates_root() {
        let registry = registry();
        let sender = Arc::new(RecordingSender::default());
        assert_eq!(
            registry.dispatch(sender.clone(), &tokens(&["vault"])),
            DispatchOutcome::Rejected
        );
        assert!(!registry.complete(sender.clone(), &tokens(&["v"])).contains(&"vault".to_string()));

        let sender = Arc::new(RecordingSender::with_permissions(&["vault.open"]));
        assert_eq!(
            registry.dispatch(sender.clone(), &tokens(&["vault"])),
            DispatchOutcome::Executed
        );
    }

    #[test]
    fn test_completion_routes_into_trees() {
        let registry = registry();
        let sender = Arc::new(RecordingSender::default());
        assert_eq!(registry.complete(sender.clone(), &tokens(&["c"])), vec!["calc"]);
        assert_eq!(
            registry.complete(sender.clone(), &tokens(&["calc", "a"])),
            vec!["add"]
        );
        assert!(registry.complete(sender, &tokens(&["nope", ""])).is_empty());
    }
}
