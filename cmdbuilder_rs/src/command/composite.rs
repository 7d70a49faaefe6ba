use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use strsim::levenshtein;
use tracing::{debug, warn};

use super::builder::CommandBuilder;
use super::help::{self, HELP_NAME};
use super::traits::{CompositeSubCommand, SubCommand};
use super::{CommandNode, DispatchOutcome, Property, validate_name};
use crate::callback::CommandCallback;
use crate::context::{CommandSender, Invocation};
use crate::error::BuildError;
use crate::inference::DefaultInferenceProvider;
use crate::metadata::CommandMetadata;
use crate::output::{HelpPage, HelpTheme, Message, shorten_description};
use crate::parser::{ArgumentParser, filter_prefix};
use crate::value::TypeKey;

type EmptyAction = Arc<dyn Fn(&Invocation) + Send + Sync>;

/// A named child of a composite with its resolved properties.
#[derive(Clone)]
pub struct Child {
    pub node: CommandNode,
    pub description: String,
    /// Usage of a leaf child. Composites have none.
    pub usage: Option<String>,
    pub permission: Option<String>,
}

impl Child {
    pub fn is_permitted(&self, sender: &dyn CommandSender) -> bool {
        self.permission
            .as_deref()
            .is_none_or(|permission| sender.has_permission(permission))
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Child")
            .field("composite", &self.node.is_composite())
            .field("description", &self.description)
            .field("usage", &self.usage)
            .field("permission", &self.permission)
            .finish()
    }
}

pub(super) struct CompositeInner {
    children: BTreeMap<String, Child>,
    theme: HelpTheme,
    on_empty: Option<EmptyAction>,
}

impl CompositeInner {
    pub(super) fn permitted_child(&self, name: &str, sender: &dyn CommandSender) -> Option<&Child> {
        self.children
            .get(name)
            .filter(|child| child.is_permitted(sender))
    }

    pub(super) fn permitted_names<'a>(
        &'a self,
        sender: &'a dyn CommandSender,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.children
            .iter()
            .filter(move |(_, child)| child.is_permitted(sender))
            .map(|(name, _)| name.as_str())
    }

    /// Every permitted child: nested composites as `name: description`, then
    /// leaves as `usage: description`.
    pub(super) fn general_help(&self, sender: &dyn CommandSender, topic: &str) -> HelpPage {
        let mut page = HelpPage::new(topic, self.theme);
        let permitted: Vec<(&String, &Child)> = self
            .children
            .iter()
            .filter(|(_, child)| child.is_permitted(sender))
            .collect();

        for (name, child) in &permitted {
            if child.usage.is_none() {
                page = page.line(name.as_str(), shorten_description(&child.description));
            }
        }
        for (_, child) in &permitted {
            if let Some(usage) = &child.usage {
                page = page.line(usage.as_str(), shorten_description(&child.description));
            }
        }
        page
    }

    pub(super) fn specific_help(&self, name: &str, child: &Child) -> HelpPage {
        let page = HelpPage::new(name, self.theme).line("Description", child.description.as_str());
        match &child.usage {
            Some(usage) => page.line("Usage", usage.as_str()),
            None => page,
        }
    }
}

/// A built node routing its first token to a named child.
#[derive(Clone)]
pub struct CompositeCommand(pub(super) Arc<CompositeInner>);

impl CompositeCommand {
    pub fn children(&self) -> &BTreeMap<String, Child> {
        &self.0.children
    }

    pub fn child(&self, name: &str) -> Option<&Child> {
        self.0.children.get(name)
    }

    pub fn theme(&self) -> HelpTheme {
        self.0.theme
    }

    /// `<label> <a|b|...>`, used when the host has no usage for this command.
    pub fn default_usage(&self, label: &str) -> String {
        let names: Vec<&str> = self.0.children.keys().map(String::as_str).collect();
        format!("{label} <{}>", names.join("|"))
    }

    /// The listing shown by `help` with no argument.
    pub fn general_help(&self, sender: &dyn CommandSender, topic: &str) -> HelpPage {
        self.0.general_help(sender, topic)
    }

    pub fn dispatch(&self, invocation: &Invocation, tokens: &[String]) -> DispatchOutcome {
        let Some((head, rest)) = tokens.split_first() else {
            match &self.0.on_empty {
                Some(action) => action(invocation),
                None => invocation.sender.send(Message::Help(
                    self.0.general_help(invocation.sender.as_ref(), invocation.alias()),
                )),
            }
            return DispatchOutcome::EmptyInvocation;
        };

        let sender = invocation.sender.as_ref();
        match self.0.permitted_child(head, sender) {
            Some(child) => {
                debug!(path = ?invocation.path, subcommand = %head, "routing");
                child.node.dispatch(&invocation.descend(head), rest)
            }
            None => {
                let message = match suggest_similar(head, self.0.permitted_names(sender)) {
                    Some(suggestion) => {
                        format!("no such subcommand '{head}', did you mean '{suggestion}'?")
                    }
                    None => format!("no such subcommand '{head}'"),
                };
                sender.send(Message::Error(message));
                DispatchOutcome::NoSuchSubcommand
            }
        }
    }

    pub fn complete(&self, invocation: &Invocation, tokens: &[String]) -> Vec<String> {
        let sender = invocation.sender.as_ref();
        match tokens {
            [] => self.0.permitted_names(sender).map(str::to_string).collect(),
            [partial] => filter_prefix(
                self.0.permitted_names(sender).map(str::to_string).collect(),
                partial,
            ),
            [head, rest @ ..] => match self.0.permitted_child(head, sender) {
                Some(child) => child.node.complete(&invocation.descend(head), rest),
                None => Vec::new(),
            },
        }
    }
}

impl fmt::Debug for CompositeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeCommand")
            .field("children", &self.0.children)
            .field("theme", &self.0.theme)
            .finish_non_exhaustive()
    }
}

/// Closest permitted name within edit distance 2.
fn suggest_similar<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best_match: Option<(&str, usize)> = None;

    for candidate in candidates {
        let distance = levenshtein(&input_lower, &candidate.to_lowercase());
        if distance <= 2 && best_match.is_none_or(|(_, best)| distance < best) {
            best_match = Some((candidate, distance));
        }
    }

    best_match.map(|(candidate, _)| candidate)
}

/// Builds a [`CompositeCommand`].
///
/// Children are resolved as they are added: leaves are built, nested
/// composites are configured and built, and deferred descriptions, usages and
/// permissions are looked up in this node's metadata. `build` then adds a
/// `help` child unless one was added explicitly.
pub struct CompositeCommandBuilder {
    children: BTreeMap<String, Child>,
    theme: HelpTheme,
    metadata: CommandMetadata,
    defaults: Arc<DefaultInferenceProvider>,
    on_empty: Option<EmptyAction>,
}

impl Default for CompositeCommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeCommandBuilder {
    pub fn new() -> Self {
        Self::with_defaults(DefaultInferenceProvider::global())
    }

    pub fn with_defaults(defaults: Arc<DefaultInferenceProvider>) -> Self {
        Self {
            children: BTreeMap::new(),
            theme: HelpTheme::default(),
            metadata: CommandMetadata::default(),
            defaults,
            on_empty: None,
        }
    }

    fn nested(&self, name: &str) -> Self {
        Self {
            children: BTreeMap::new(),
            theme: self.theme,
            metadata: self.metadata.subcommand(name).cloned().unwrap_or_default(),
            defaults: Arc::clone(&self.defaults),
            on_empty: None,
        }
    }

    /// Fallback metadata for this node. Must come before any child is added.
    pub fn with_metadata(&mut self, metadata: CommandMetadata) -> Result<&mut Self, BuildError> {
        if !self.children.is_empty() {
            return Err(BuildError::MetadataAfterChildren);
        }
        self.metadata = metadata;
        Ok(self)
    }

    pub fn metadata(&self) -> &CommandMetadata {
        &self.metadata
    }

    /// Theme for this node's help. Composites nested afterwards inherit it.
    pub fn help_theme(&mut self, theme: HelpTheme) -> &mut Self {
        self.theme = theme;
        self
    }

    pub fn theme(&self) -> HelpTheme {
        self.theme
    }

    /// Run `action` instead of showing general help when invoked with no
    /// tokens.
    pub fn on_empty(&mut self, action: impl Fn(&Invocation) + Send + Sync + 'static) -> &mut Self {
        self.on_empty = Some(Arc::new(action));
        self
    }

    /// Defaults for leaves and composites added after this call. Registering
    /// through this forks a shared provider, so parents and siblings are
    /// unaffected.
    pub fn defaults_mut(&mut self) -> &mut DefaultInferenceProvider {
        Arc::make_mut(&mut self.defaults)
    }

    pub fn register_default(
        &mut self,
        ty: TypeKey,
        parser: impl ArgumentParser,
    ) -> Result<&mut Self, BuildError> {
        self.defaults_mut().register(ty, parser)?;
        Ok(self)
    }

    /// Add a leaf with explicit description and usage.
    pub fn command<F>(
        &mut self,
        name: &str,
        description: impl Into<String>,
        usage: impl Into<String>,
        configure: F,
        callback: impl CommandCallback + 'static,
    ) -> Result<&mut Self, BuildError>
    where
        F: FnOnce(&mut CommandBuilder) -> Result<(), BuildError>,
    {
        self.ensure_vacant(name)?;
        let usage = usage.into();
        let mut builder = CommandBuilder::with_defaults(Arc::clone(&self.defaults));
        builder.usage_message(usage.clone());
        configure(&mut builder)?;
        let leaf = builder.build(callback)?;

        self.insert(
            name,
            Child {
                node: CommandNode::Leaf(leaf),
                description: description.into(),
                usage: Some(usage),
                permission: None,
            },
        )
    }

    /// Add a nested composite with an explicit description.
    pub fn nest<F>(
        &mut self,
        name: &str,
        description: impl Into<String>,
        configure: F,
    ) -> Result<&mut Self, BuildError>
    where
        F: FnOnce(&mut CompositeCommandBuilder) -> Result<(), BuildError>,
    {
        self.ensure_vacant(name)?;
        let mut builder = self.nested(name);
        configure(&mut builder)?;

        self.insert(
            name,
            Child {
                node: CommandNode::Composite(builder.build()),
                description: description.into(),
                usage: None,
                permission: None,
            },
        )
    }

    /// Add a [`SubCommand`] leaf.
    pub fn subcommand<S: SubCommand>(&mut self, subcommand: S) -> Result<&mut Self, BuildError> {
        self.subcommand_arc(Arc::new(subcommand))
    }

    pub fn subcommand_arc(&mut self, subcommand: Arc<dyn SubCommand>) -> Result<&mut Self, BuildError> {
        let name = subcommand.name().to_string();
        self.ensure_vacant(&name)?;

        let entry = self.metadata.subcommand(&name);
        let description = resolve_description(&name, subcommand.description(), entry);
        let usage = resolve_usage(&name, subcommand.usage(), entry);
        let permission = resolve_permission(&name, subcommand.permission(), entry);

        let mut builder = CommandBuilder::with_defaults(Arc::clone(&self.defaults));
        builder.usage_message(usage.clone());
        subcommand.configure(&mut builder)?;
        let leaf = builder.build(Arc::clone(&subcommand).callback())?;

        self.insert(
            &name,
            Child {
                node: CommandNode::Leaf(leaf),
                description,
                usage: Some(usage),
                permission,
            },
        )
    }

    /// Add a [`CompositeSubCommand`].
    pub fn composite_subcommand<C: CompositeSubCommand>(
        &mut self,
        subcommand: C,
    ) -> Result<&mut Self, BuildError> {
        self.composite_subcommand_with(Arc::new(subcommand), |_| Ok(()))
    }

    /// Add a [`CompositeSubCommand`], running `extend` on its builder after
    /// its own `configure`.
    pub fn composite_subcommand_with<F>(
        &mut self,
        subcommand: Arc<dyn CompositeSubCommand>,
        extend: F,
    ) -> Result<&mut Self, BuildError>
    where
        F: FnOnce(&mut CompositeCommandBuilder) -> Result<(), BuildError>,
    {
        let name = subcommand.name().to_string();
        self.ensure_vacant(&name)?;

        let entry = self.metadata.subcommand(&name);
        let description = resolve_description(&name, subcommand.description(), entry);
        let permission = resolve_permission(&name, subcommand.permission(), entry);

        let mut builder = self.nested(&name);
        subcommand.configure(&mut builder)?;
        extend(&mut builder)?;

        self.insert(
            &name,
            Child {
                node: CommandNode::Composite(builder.build()),
                description,
                usage: None,
                permission,
            },
        )
    }

    pub fn build(self) -> CompositeCommand {
        let Self {
            mut children,
            theme,
            on_empty,
            ..
        } = self;

        let inner = Arc::new_cyclic(|composite: &Weak<CompositeInner>| {
            if !children.contains_key(HELP_NAME) {
                children.insert(HELP_NAME.to_string(), help::help_child(composite.clone()));
            }
            CompositeInner {
                children,
                theme,
                on_empty,
            }
        });
        CompositeCommand(inner)
    }

    fn ensure_vacant(&self, name: &str) -> Result<(), BuildError> {
        validate_name(name)?;
        if self.children.contains_key(name) {
            return Err(BuildError::DuplicateChild {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, child: Child) -> Result<&mut Self, BuildError> {
        self.ensure_vacant(name)?;
        self.children.insert(name.to_string(), child);
        Ok(self)
    }
}

fn resolve_description(
    name: &str,
    property: Property<String>,
    entry: Option<&CommandMetadata>,
) -> String {
    let fallback = || format!("Description for {name}");
    match property {
        Property::Explicit(description) => description,
        Property::Absent => fallback(),
        Property::Deferred => match entry.and_then(|entry| entry.description.clone()) {
            Some(description) => description,
            None => {
                warn!(command = name, "missing description metadata");
                fallback()
            }
        },
    }
}

fn resolve_usage(name: &str, property: Property<String>, entry: Option<&CommandMetadata>) -> String {
    match property {
        Property::Explicit(usage) => usage,
        Property::Absent => name.to_string(),
        Property::Deferred => match entry.and_then(|entry| entry.usage.clone()) {
            Some(usage) => usage,
            None => {
                warn!(command = name, "missing usage metadata");
                name.to_string()
            }
        },
    }
}

fn resolve_permission(
    name: &str,
    property: Property<String>,
    entry: Option<&CommandMetadata>,
) -> Option<String> {
    match property {
        Property::Explicit(permission) => Some(permission),
        Property::Absent => None,
        Property::Deferred => {
            let permission = entry.and_then(|entry| entry.permission.clone());
            if permission.is_none() {
                debug!(command = name, "no permission metadata, visible to everyone");
            }
            permission
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::from_fn;
    use crate::parser::test_support::RecordingSender;
    use crate::parser::{ArgumentParserExt, IntegerArgument};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn noop(b: &mut CommandBuilder) -> Result<(), BuildError> {
        let _ = b;
        Ok(())
    }

    fn tree() -> CompositeCommand {
        let mut root = CompositeCommandBuilder::new();
        root.command("add", "Add", "add", noop, from_fn(|_, _| Ok(())))
            .and_then(|r| r.command("sub", "Subtract", "sub", noop, from_fn(|_, _| Ok(()))))
            .expect("children");
        root.build()
    }

    fn invocation(sender: &Arc<RecordingSender>) -> Invocation {
        Invocation::new(Arc::clone(sender) as Arc<dyn CommandSender>, "calc")
    }

    #[test]
    fn test_help_is_synthesized() {
        let tree = tree();
        let names: Vec<&String> = tree.children().keys().collect();
        assert_eq!(names, vec!["add", "help", "sub"]);
        assert_eq!(tree.default_usage("calc"), "calc <add|help|sub>");
    }

    #[test]
    fn test_duplicate_child_rejected() {
        let mut root = CompositeCommandBuilder::new();
        root.command("add", "Add", "add", noop, from_fn(|_, _| Ok(())))
            .expect("first");
        let err = root
            .command("add", "Add", "add", noop, from_fn(|_, _| Ok(())))
            .err()
            .expect("duplicate");
        assert!(matches!(err, BuildError::DuplicateChild { .. }));
        assert!(matches!(
            root.nest("bad name", "x", |_| Ok(())).err(),
            Some(BuildError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_metadata_must_come_first() {
        let mut root = CompositeCommandBuilder::new();
        root.command("add", "Add", "add", noop, from_fn(|_, _| Ok(())))
            .expect("child");
        assert!(matches!(
            root.with_metadata(CommandMetadata::default()).err(),
            Some(BuildError::MetadataAfterChildren)
        ));
    }

    #[test]
    fn test_unknown_subcommand_suggests_permitted_name() {
        let sender = Arc::new(RecordingSender::default());
        let outcome = tree().dispatch(&invocation(&sender), &tokens(&["ad"]));
        assert_eq!(outcome, DispatchOutcome::NoSuchSubcommand);
        assert_eq!(
            sender.take(),
            vec![Message::Error(
                "no such subcommand 'ad', did you mean 'add'?".into()
            )]
        );

        tree().dispatch(&invocation(&sender), &tokens(&["zzzzzz"]));
        assert_eq!(
            sender.take(),
            vec![Message::Error("no such subcommand 'zzzzzz'".into())]
        );
    }

    #[test]
    fn test_empty_invocation_shows_general_help() {
        let sender = Arc::new(RecordingSender::default());
        let outcome = tree().dispatch(&invocation(&sender), &[]);
        assert_eq!(outcome, DispatchOutcome::EmptyInvocation);
        let messages = sender.take();
        let Message::Help(page) = &messages[0] else {
            panic!("expected help, got {messages:?}");
        };
        assert_eq!(page.topic, "calc");
        let labels: Vec<&str> = page.lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["add", "help [subcommand]", "sub"]);
    }

    #[test]
    fn test_custom_empty_action() {
        let mut root = CompositeCommandBuilder::new();
        root.on_empty(|invocation| {
            invocation
                .sender
                .send(Message::Info(format!("try '{} help'", invocation.alias())))
        });
        let sender = Arc::new(RecordingSender::default());
        root.build().dispatch(&invocation(&sender), &[]);
        assert_eq!(sender.take(), vec![Message::Info("try 'calc help'".into())]);
    }

    #[test]
    fn test_nested_composites_listed_first_and_inherit_theme() {
        let theme = HelpTheme::default().with_label(crate::output::ThemeColor::Cyan);
        let mut root = CompositeCommandBuilder::new();
        root.help_theme(theme);
        root.command("zeta", "Leaf", "zeta", noop, from_fn(|_, _| Ok(())))
            .and_then(|r| r.nest("alpha", "A".repeat(60), |_| Ok(())))
            .expect("children");
        let tree = root.build();

        let sender = Arc::new(RecordingSender::default());
        let page = tree.general_help(sender.as_ref(), "root");
        assert_eq!(page.lines[0].label, "alpha");
        assert_eq!(page.lines[0].text, format!("{}...", "A".repeat(47)));

        let Some(Child {
            node: CommandNode::Composite(alpha),
            ..
        }) = tree.child("alpha")
        else {
            panic!("alpha should be a composite");
        };
        assert_eq!(alpha.theme(), theme);
    }

    #[test]
    fn test_completion_of_first_token() {
        let sender = Arc::new(RecordingSender::default());
        let tree = tree();
        assert_eq!(
            tree.complete(&invocation(&sender), &tokens(&["s"])),
            vec!["sub".to_string()]
        );
        assert_eq!(tree.complete(&invocation(&sender), &[]).len(), 3);
        assert!(
            tree.complete(&invocation(&sender), &tokens(&["nope", ""]))
                .is_empty()
        );
    }

    #[test]
    fn test_completion_delegates_to_child() {
        let mut root = CompositeCommandBuilder::new();
        root.command(
            "pick",
            "Pick",
            "pick <n>",
            |b| {
                b.argument(IntegerArgument::new().using_completions(|| ["10", "20", "3"]))?;
                Ok(())
            },
            from_fn(|_, _| Ok(())),
        )
        .expect("pick");
        let sender = Arc::new(RecordingSender::default());
        assert_eq!(
            root.build()
                .complete(&invocation(&sender), &tokens(&["pick", "1"])),
            vec!["10".to_string()]
        );
    }

    #[test]
    fn test_register_default_forks_per_subtree() {
        struct Celsius;
        let mut root = CompositeCommandBuilder::new();
        root.nest("weather", "Weather", |weather| {
            weather.register_default(
                TypeKey::of::<Celsius>(),
                IntegerArgument::new().map(|_| Celsius),
            )?;
            assert!(weather.defaults_mut().get(&TypeKey::of::<Celsius>()).is_some());
            Ok(())
        })
        .expect("nest");
        assert!(root.defaults_mut().get(&TypeKey::of::<Celsius>()).is_none());
    }

    #[test]
    fn test_suggest_similar_prefers_closest() {
        let names = ["help", "heap", "add"];
        assert_eq!(suggest_similar("hepl", names.iter().copied()), Some("help"));
        assert_eq!(suggest_similar("xyzzy", names.iter().copied()), None);
    }
}
