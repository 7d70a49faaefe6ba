use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, warn};

use super::demo::{default_metadata, demo_registry};
use super::sender::{ConsoleSender, tokenize, tokenize_for_completion};
use crate::command::DispatchOutcome;
use crate::context::CommandSender;
use crate::metadata::MetadataFile;
use crate::output::{ColorMode, Painter, parse_color_mode};
use crate::registry::CommandRegistry;

#[derive(Parser, Debug)]
#[command(name = "cmdb")]
#[command(about = "Run commands from a command tree on the console")]
#[command(version)]
pub struct Args {
    /// Fallback metadata for command descriptions, usages and permissions
    #[arg(long, default_value = ".cmdb/commands.toml")]
    pub metadata: PathBuf,

    /// Grant a permission to the console sender ("*" grants all)
    #[arg(long = "grant", value_name = "PERMISSION")]
    pub grants: Vec<String>,

    /// Act as a script rather than a person at a prompt
    #[arg(long)]
    pub non_interactive: bool,

    /// Run one line and exit
    #[arg(long, value_name = "LINE", conflicts_with = "complete")]
    pub exec: Option<String>,

    /// Print completion candidates for a line, one per line, and exit
    #[arg(long, value_name = "LINE")]
    pub complete: Option<String>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", value_parser = parse_color_mode)]
    pub color: ColorMode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

pub fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Logs go to stderr, stdout is for command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.parse().unwrap_or_default()),
        )
        .init();

    let metadata = if args.metadata.exists() {
        info!(path = %args.metadata.display(), "loading metadata");
        MetadataFile::load_from_path(&args.metadata)
    } else {
        debug!(path = %args.metadata.display(), "no metadata file, using built-in metadata");
        default_metadata()
    };

    let (registry, report) = demo_registry(metadata);
    for failure in &report.failed {
        warn!(command_type = %failure.type_name, "skipped: {}", failure.reason);
    }

    let painter = Painter::new(args.color);
    let sender = Arc::new(ConsoleSender::new(
        "console",
        args.grants.clone(),
        !args.non_interactive,
        painter,
    ));

    if let Some(line) = &args.complete {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for candidate in registry.complete(sender, &tokenize_for_completion(strip_slash(line))) {
            writeln!(out, "{candidate}")?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(line) = &args.exec {
        let outcome = registry.dispatch(sender, &tokenize(strip_slash(line)));
        return Ok(exit_code(outcome));
    }

    repl(&registry, sender)?;
    Ok(ExitCode::SUCCESS)
}

fn repl(registry: &CommandRegistry, sender: Arc<ConsoleSender>) -> anyhow::Result<()> {
    let prompt = std::io::stdin().is_terminal();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if prompt {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = strip_slash(line.trim());
        match line {
            "" => continue,
            "exit" | "quit" => break,
            _ => {
                let outcome = registry.dispatch(
                    Arc::clone(&sender) as Arc<dyn CommandSender>,
                    &tokenize(line),
                );
                debug!(?outcome, "dispatched");
            }
        }
    }
    Ok(())
}

fn strip_slash(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix('/').unwrap_or(line)
}

fn exit_code(outcome: DispatchOutcome) -> ExitCode {
    match outcome {
        DispatchOutcome::Executed | DispatchOutcome::EmptyInvocation => ExitCode::SUCCESS,
        DispatchOutcome::ParseFailed
        | DispatchOutcome::NoSuchSubcommand
        | DispatchOutcome::Rejected => ExitCode::from(1),
        DispatchOutcome::InternalError => ExitCode::from(2),
    }
}
