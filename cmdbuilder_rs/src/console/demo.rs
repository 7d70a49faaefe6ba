//! The command tree served by `cmdb`.
//!
//! `calc` is a composite wired up by auto-registration, `echo`, `tp` and
//! `whoami` are top-level leaves.

use std::sync::{Arc, Mutex};

use crate::auto::{AutoCandidate, AutoCommandBuilder, RegistrationReport};
use crate::callback::{Arguments, Executable, from_fn};
use crate::command::{
    CommandBuilder, CompositeCommandBuilder, CompositeSubCommand, CompositeTopLevelCommand,
    SubCommand, TopLevelCommand,
};
use crate::context::CommandContext;
use crate::error::{BuildError, CommandError};
use crate::inference::{Members, ParserTag};
use crate::metadata::MetadataFile;
use crate::output::{HelpTheme, Message, ThemeColor};
use crate::parser::{Axis, CoordArgument, IntegerArgument, StringSetArgument};
use crate::registry::CommandRegistry;
use crate::signature::{Param, Signature};

/// Metadata used when no metadata file is found.
pub const DEFAULT_METADATA: &str = r#"
[commands.calc]
description = "Arithmetic on the console"

[commands.calc.subcommands.add]
description = "Add two integers"
usage = "calc add <a> <b>"

[commands.calc.subcommands.div]
description = "Divide one number by another"
usage = "calc div <a> <b>"

[commands.calc.subcommands.sum]
description = "Add any number of integers"
usage = "calc sum <n...>"

[commands.calc.subcommands.round]
description = "Round a number to a number of decimal places"
usage = "calc round <x> [places]"

[commands.calc.subcommands.history]
description = "Show recent results"
usage = "calc history [count]"

[commands.calc.subcommands.admin]
description = "Calculator administration"
permission = "cmdb.admin"

[commands.calc.subcommands.admin.subcommands.reset]
description = "Forget the last result or the whole history"
usage = "calc admin reset <history|last>"

[commands.echo]
description = "Print the arguments back"
usage = "echo <words...>"

[commands.tp]
description = "Teleport to a block position"
usage = "tp <x> <y> <z>"

[commands.whoami]
description = "Show who you are"
usage = "whoami"
"#;

pub fn default_metadata() -> MetadataFile {
    MetadataFile::from_toml_str(DEFAULT_METADATA).unwrap_or_default()
}

/// Results shared by the `calc` subcommands.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    fn record(&self, entry: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn clear(&self) -> usize {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries).len())
            .unwrap_or_default()
    }

    fn pop(&self) -> Option<String> {
        self.entries.lock().ok()?.pop()
    }
}

fn report(ctx: &CommandContext, history: &History, entry: String) {
    ctx.reply(Message::Info(entry.clone()));
    history.record(entry);
}

#[derive(Default)]
pub struct Calc {
    history: Arc<History>,
}

impl CompositeTopLevelCommand for Calc {
    fn name(&self) -> &str {
        "calc"
    }

    fn configure(&self, builder: &mut CompositeCommandBuilder) -> Result<(), BuildError> {
        let history = Arc::clone(&self.history);
        builder.help_theme(
            HelpTheme::default()
                .with_border(ThemeColor::Gray)
                .with_heading(ThemeColor::Cyan)
                .with_text(ThemeColor::White),
        );
        builder.command(
            "sub",
            "Subtract one integer from another",
            "calc sub <a> <b>",
            |b: &mut CommandBuilder| {
                b.argument(IntegerArgument::new())?
                    .argument(IntegerArgument::new())?;
                Ok(())
            },
            from_fn(move |args, ctx| {
                let a: i32 = args.get(0)?;
                let b: i32 = args.get(1)?;
                let result = i64::from(a) - i64::from(b);
                report(ctx, &history, format!("{a} - {b} = {result}"));
                Ok(())
            }),
        )?;
        Ok(())
    }
}

pub struct Add {
    history: Arc<History>,
}

impl Executable for Add {
    fn signature(&self) -> Signature {
        Signature::new("add")
            .param(Param::new::<i32>("a"))
            .param(Param::new::<i32>("b"))
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let a: i32 = args.get(0)?;
        let b: i32 = args.get(1)?;
        let result = i64::from(a) + i64::from(b);
        report(ctx, &self.history, format!("{a} + {b} = {result}"));
        Ok(())
    }
}

impl SubCommand for Add {
    fn name(&self) -> &str {
        "add"
    }
}

pub struct Div {
    history: Arc<History>,
}

impl Executable for Div {
    fn signature(&self) -> Signature {
        Signature::new("div")
            .param(Param::new::<f64>("a"))
            .param(Param::new::<f64>("b"))
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let a: f64 = args.get(0)?;
        let b: f64 = args.get(1)?;
        if b == 0.0 {
            return Err(CommandError::usage("cannot divide by zero"));
        }
        report(ctx, &self.history, format!("{a} / {b} = {}", a / b));
        Ok(())
    }
}

impl SubCommand for Div {
    fn name(&self) -> &str {
        "div"
    }
}

pub struct Sum {
    history: Arc<History>,
}

impl Executable for Sum {
    fn signature(&self) -> Signature {
        Signature::new("sum").param(
            Param::variadic::<i32>("numbers").tag(IntegerArgument::tag(-1_000_000, 1_000_000)),
        )
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let numbers: Vec<i32> = args.variadic()?;
        let total: i64 = numbers.iter().copied().map(i64::from).sum();
        let terms: Vec<String> = numbers.iter().map(i32::to_string).collect();
        let expression = if terms.is_empty() {
            "0".to_string()
        } else {
            terms.join(" + ")
        };
        report(ctx, &self.history, format!("{expression} = {total}"));
        Ok(())
    }
}

impl SubCommand for Sum {
    fn name(&self) -> &str {
        "sum"
    }
}

pub struct Round {
    history: Arc<History>,
}

impl Executable for Round {
    fn signature(&self) -> Signature {
        Signature::new("round")
            .param(Param::new::<f64>("x"))
            .param(
                Param::optional::<i32>("places")
                    .tag(IntegerArgument::tag(0, 6))
                    .tag(ParserTag::optional()),
            )
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let x: f64 = args.get(0)?;
        let places = args.get_opt::<i32>(1)?.unwrap_or(0);
        let places = usize::try_from(places).unwrap_or_default();
        report(ctx, &self.history, format!("{x:.places$}"));
        Ok(())
    }
}

impl SubCommand for Round {
    fn name(&self) -> &str {
        "round"
    }
}

pub struct HistoryCommand {
    history: Arc<History>,
}

impl Executable for HistoryCommand {
    fn signature(&self) -> Signature {
        Signature::new("history").param(
            Param::optional::<i32>("count")
                .tag(IntegerArgument::tag(1, 100))
                .tag(ParserTag::optional()),
        )
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let count = args.get_opt::<i32>(0)?.unwrap_or(10);
        let entries = self.history.entries();
        if entries.is_empty() {
            ctx.reply(Message::Info("no results yet".into()));
            return Ok(());
        }
        let skip = entries
            .len()
            .saturating_sub(usize::try_from(count).unwrap_or_default());
        for entry in &entries[skip..] {
            ctx.reply(Message::Info(entry.clone()));
        }
        Ok(())
    }
}

impl SubCommand for HistoryCommand {
    fn name(&self) -> &str {
        "history"
    }
}

#[derive(Default)]
pub struct Admin;

impl CompositeSubCommand for Admin {
    fn name(&self) -> &str {
        "admin"
    }
}

pub struct Reset {
    history: Arc<History>,
}

impl Executable for Reset {
    fn signature(&self) -> Signature {
        Signature::new("reset").param(Param::new::<String>("scope").tag(ParserTag::member("scopes")))
    }

    fn members(&self) -> Members {
        Members::new("Reset").method("scopes", || StringSetArgument::new(["history", "last"]))
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let scope: String = args.get(0)?;
        let message = match scope.as_str() {
            "history" => format!("cleared {} results", self.history.clear()),
            _ => match self.history.pop() {
                Some(entry) => format!("forgot '{entry}'"),
                None => "no results yet".to_string(),
            },
        };
        ctx.reply(Message::Info(message));
        Ok(())
    }
}

impl SubCommand for Reset {
    fn name(&self) -> &str {
        "reset"
    }
}

#[derive(Default)]
pub struct Echo;

impl Executable for Echo {
    fn signature(&self) -> Signature {
        Signature::new("echo").param(Param::variadic::<String>("words"))
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        ctx.reply(Message::Info(args.variadic::<String>()?.join(" ")));
        Ok(())
    }
}

impl TopLevelCommand for Echo {
    fn name(&self) -> &str {
        "echo"
    }
}

#[derive(Default)]
pub struct Teleport;

impl Executable for Teleport {
    fn signature(&self) -> Signature {
        Signature::new("tp")
            .param(Param::new::<i32>("x"))
            .param(Param::new::<i32>("y"))
            .param(Param::new::<i32>("z"))
    }

    fn execute(&self, ctx: &CommandContext, args: Arguments) -> Result<(), CommandError> {
        let (x, y, z): (i32, i32, i32) = (args.get(0)?, args.get(1)?, args.get(2)?);
        ctx.reply(Message::Info(format!(
            "teleported {} to {x} {y} {z}",
            ctx.sender.name()
        )));
        Ok(())
    }
}

impl TopLevelCommand for Teleport {
    fn name(&self) -> &str {
        "tp"
    }

    fn configure(&self, builder: &mut CommandBuilder) -> Result<(), BuildError> {
        builder
            .argument(CoordArgument::new(Axis::X))?
            .argument(CoordArgument::new(Axis::Y))?
            .argument(CoordArgument::new(Axis::Z))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct Whoami;

impl Executable for Whoami {
    fn signature(&self) -> Signature {
        Signature::new("whoami").interactive_only()
    }

    fn execute(&self, ctx: &CommandContext, _args: Arguments) -> Result<(), CommandError> {
        ctx.reply(Message::Info(format!("you are {}", ctx.sender.name())));
        Ok(())
    }
}

impl TopLevelCommand for Whoami {
    fn name(&self) -> &str {
        "whoami"
    }
}

/// Register the demo commands declared in `metadata`.
pub fn demo_registry(metadata: MetadataFile) -> (CommandRegistry, RegistrationReport) {
    let mut registry = CommandRegistry::new(metadata);
    let history = Arc::new(History::default());

    let shared = |history: &Arc<History>| {
        let history = Arc::clone(history);
        move || Arc::clone(&history)
    };
    let calc = shared(&history);
    let add = shared(&history);
    let div = shared(&history);
    let sum = shared(&history);
    let round = shared(&history);
    let recent = shared(&history);
    let reset = shared(&history);

    let report = AutoCommandBuilder::new()
        .source(vec![
            AutoCandidate::composite_with(move |_| Ok(Calc { history: calc() })),
            AutoCandidate::subcommand_of_with::<_, Calc, _>(move |_| Ok(Add { history: add() })),
            AutoCandidate::subcommand_of_with::<_, Calc, _>(move |_| Ok(Div { history: div() })),
            AutoCandidate::subcommand_of_with::<_, Calc, _>(move |_| Ok(Sum { history: sum() })),
            AutoCandidate::subcommand_of_with::<_, Calc, _>(move |_| {
                Ok(Round { history: round() })
            }),
            AutoCandidate::subcommand_of_with::<_, Calc, _>(move |_| {
                Ok(HistoryCommand { history: recent() })
            }),
            AutoCandidate::composite_subcommand_of::<Admin, Calc>(),
            AutoCandidate::subcommand_of_with::<_, Admin, _>(move |_| {
                Ok(Reset { history: reset() })
            }),
            AutoCandidate::top_level::<Echo>(),
            AutoCandidate::top_level::<Teleport>(),
            AutoCandidate::top_level::<Whoami>(),
        ])
        .register(&mut registry);

    (registry, report)
}
