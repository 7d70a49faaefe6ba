use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use anyhow::anyhow;

use super::composite::{Child, CompositeInner};
use super::leaf::LeafCommand;
use super::CommandNode;
use crate::callback::{Arguments, CommandCallback};
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, CommandError};
use crate::output::Message;
use crate::parser::{ArgumentParser, ArgumentParserExt};
use crate::value::Value;

pub const HELP_NAME: &str = "help";
pub const HELP_USAGE: &str = "help [subcommand]";
pub const HELP_DESCRIPTION: &str = "Show help for subcommands";

/// Name of a child the sender may see.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HelpTopic(String);

struct HelpTopicArgument {
    composite: Weak<CompositeInner>,
}

impl ArgumentParser for HelpTopicArgument {
    type Output = HelpTopic;

    fn parse(
        &self,
        token: &str,
        _position: usize,
        ctx: &CommandContext,
    ) -> Result<HelpTopic, ArgumentParseError> {
        self.composite
            .upgrade()
            .filter(|composite| {
                composite
                    .permitted_child(token, ctx.sender.as_ref())
                    .is_some()
            })
            .map(|_| HelpTopic(token.to_string()))
            .ok_or_else(|| ArgumentParseError::new("no such subcommand"))
    }

    fn complete(
        &self,
        _prior: &[Option<Value>],
        _partial: &str,
        _position: usize,
        ctx: &CommandContext,
    ) -> BTreeSet<String> {
        self.composite
            .upgrade()
            .map(|composite| {
                composite
                    .permitted_names(ctx.sender.as_ref())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct HelpCallback {
    composite: Weak<CompositeInner>,
}

impl CommandCallback for HelpCallback {
    fn on_success(&self, args: Arguments, ctx: &CommandContext) -> Result<(), CommandError> {
        let composite = self
            .composite
            .upgrade()
            .ok_or_else(|| CommandError::Internal(anyhow!("help outlived its command")))?;

        let page = match args.get_opt::<HelpTopic>(0)? {
            None => composite.general_help(ctx.sender.as_ref(), ctx.parent_alias()),
            Some(HelpTopic(name)) => {
                let child = composite
                    .permitted_child(&name, ctx.sender.as_ref())
                    .ok_or_else(|| CommandError::usage("no such subcommand"))?;
                composite.specific_help(&name, child)
            }
        };
        ctx.reply(Message::Help(page));
        Ok(())
    }
}

/// The `help` leaf every composite gets unless it defines its own.
pub(super) fn help_child(composite: Weak<CompositeInner>) -> Child {
    let topic = HelpTopicArgument {
        composite: composite.clone(),
    }
    .optional()
    .erase();

    let leaf = LeafCommand::new(
        vec![topic],
        None,
        Some(HELP_USAGE.to_string()),
        Arc::new(HelpCallback { composite }),
    );

    Child {
        node: CommandNode::Leaf(leaf),
        description: HELP_DESCRIPTION.to_string(),
        usage: Some(HELP_USAGE.to_string()),
        permission: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::from_fn;
    use crate::command::{CompositeCommand, CompositeCommandBuilder, SubCommand};
    use crate::command::{DispatchOutcome, Property};
    use crate::callback::Executable;
    use crate::context::{CommandSender, Invocation};
    use crate::output::HelpLine;
    use crate::parser::test_support::RecordingSender;
    use crate::signature::Signature;

    struct Secret;

    impl Executable for Secret {
        fn signature(&self) -> Signature {
            Signature::new("secret")
        }

        fn execute(&self, _ctx: &CommandContext, _args: Arguments) -> Result<(), CommandError> {
            Ok(())
        }
    }

    impl SubCommand for Secret {
        fn name(&self) -> &str {
            "secret"
        }

        fn description(&self) -> Property<String> {
            Property::Explicit("Hidden things".into())
        }

        fn usage(&self) -> Property<String> {
            Property::Explicit("secret".into())
        }

        fn permission(&self) -> Property<String> {
            Property::Explicit("app.secret".into())
        }
    }

    fn tree() -> CompositeCommand {
        let mut root = CompositeCommandBuilder::new();
        root.command(
            "add",
            "Add two numbers",
            "add <a> <b>",
            |_| Ok(()),
            from_fn(|_, _| Ok(())),
        )
        .and_then(|r| r.subcommand(Secret))
        .and_then(|r| r.nest("admin", "Administration", |_| Ok(())))
        .expect("tree");
        root.build()
    }

    fn run(sender: &Arc<RecordingSender>, tokens: &[&str]) -> (DispatchOutcome, Vec<Message>) {
        let invocation = Invocation::new(Arc::clone(sender) as Arc<dyn CommandSender>, "calc");
        let tokens: Vec<String> = tokens.iter().map(|s| s.to_string()).collect();
        let outcome = tree().dispatch(&invocation, &tokens);
        (outcome, sender.take())
    }

    #[test]
    fn test_general_help_lists_permitted_children() {
        let sender = Arc::new(RecordingSender::default());
        let (outcome, messages) = run(&sender, &["help"]);
        assert_eq!(outcome, DispatchOutcome::Executed);
        let Message::Help(page) = &messages[0] else {
            panic!("expected help, got {messages:?}");
        };
        assert_eq!(page.topic, "calc");
        assert_eq!(
            page.lines,
            vec![
                HelpLine::new("admin", "Administration"),
                HelpLine::new("add <a> <b>", "Add two numbers"),
                HelpLine::new(HELP_USAGE, HELP_DESCRIPTION),
            ]
        );

        let sender = Arc::new(RecordingSender::with_permissions(&["app.secret"]));
        let (_, messages) = run(&sender, &["help"]);
        let Message::Help(page) = &messages[0] else {
            panic!("expected help");
        };
        assert!(page.lines.contains(&HelpLine::new("secret", "Hidden things")));
    }

    #[test]
    fn test_specific_help() {
        let sender = Arc::new(RecordingSender::default());
        let (_, messages) = run(&sender, &["help", "add"]);
        let Message::Help(page) = &messages[0] else {
            panic!("expected help");
        };
        assert_eq!(page.topic, "add");
        assert_eq!(
            page.lines,
            vec![
                HelpLine::new("Description", "Add two numbers"),
                HelpLine::new("Usage", "add <a> <b>"),
            ]
        );

        let (_, messages) = run(&sender, &["help", "admin"]);
        let Message::Help(page) = &messages[0] else {
            panic!("expected help");
        };
        assert_eq!(page.lines, vec![HelpLine::new("Description", "Administration")]);
    }

    #[test]
    fn test_help_for_hidden_child_is_a_parse_failure() {
        let sender = Arc::new(RecordingSender::default());
        let (outcome, messages) = run(&sender, &["help", "secret"]);
        assert_eq!(outcome, DispatchOutcome::ParseFailed);
        assert_eq!(
            messages,
            vec![
                Message::Error("Incorrect command: no such subcommand".into()),
                Message::Usage(HELP_USAGE.into()),
            ]
        );
    }

    #[test]
    fn test_help_completes_permitted_names() {
        let sender = Arc::new(RecordingSender::default());
        let invocation = Invocation::new(Arc::clone(&sender) as Arc<dyn CommandSender>, "calc");
        let tokens = vec!["help".to_string(), "a".to_string()];
        assert_eq!(tree().complete(&invocation, &tokens), vec!["add", "admin"]);

        let sender = Arc::new(RecordingSender::with_permissions(&["app.secret"]));
        let invocation = Invocation::new(Arc::clone(&sender) as Arc<dyn CommandSender>, "calc");
        let tokens = vec!["help".to_string(), "s".to_string()];
        assert_eq!(tree().complete(&invocation, &tokens), vec!["secret"]);
    }
}
