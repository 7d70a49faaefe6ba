//! Auto-registration of self-describing commands.
//!
//! A source lists candidates, each marked with its node kind. Subcommands
//! name their parent by type. The pass instantiates every candidate, wires
//! subcommands into their parents and attaches the top-level commands to the
//! registry. A candidate that can't be created or built is logged and skipped
//! without aborting the pass.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::command::{
    CompositeCommandBuilder, CompositeSubCommand, CompositeTopLevelCommand, SubCommand,
    TopLevelCommand,
};
use crate::error::BuildError;
use crate::inference::DefaultInferenceProvider;
use crate::metadata::MetadataFile;
use crate::registry::CommandRegistry;

/// Passed to candidate factories.
pub struct AutoCommandContext<'a> {
    pub metadata: &'a MetadataFile,
    pub defaults: &'a Arc<DefaultInferenceProvider>,
}

type Factory<T> = Arc<dyn Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> + Send + Sync>;

#[derive(Clone)]
enum Kind {
    TopLevel(Factory<Arc<dyn TopLevelCommand>>),
    CompositeTopLevel(Factory<Arc<dyn CompositeTopLevelCommand>>),
    Sub {
        parent: &'static str,
        make: Factory<Arc<dyn SubCommand>>,
    },
    CompositeSub {
        parent: &'static str,
        make: Factory<Arc<dyn CompositeSubCommand>>,
    },
    Unmarked,
}

/// One type offered to the registration pass.
#[derive(Clone)]
pub struct AutoCandidate {
    type_name: &'static str,
    kind: Kind,
}

fn default_factory<T: Default>() -> impl Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> {
    |_| Ok(T::default())
}

impl AutoCandidate {
    pub fn top_level<T: TopLevelCommand + Default>() -> Self {
        Self::top_level_with(default_factory::<T>())
    }

    pub fn top_level_with<T, F>(factory: F) -> Self
    where
        T: TopLevelCommand,
        F: Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            kind: Kind::TopLevel(Arc::new(move |ctx: &AutoCommandContext<'_>| {
                Ok(Arc::new(factory(ctx)?) as Arc<dyn TopLevelCommand>)
            })),
        }
    }

    pub fn composite<T: CompositeTopLevelCommand + Default>() -> Self {
        Self::composite_with(default_factory::<T>())
    }

    pub fn composite_with<T, F>(factory: F) -> Self
    where
        T: CompositeTopLevelCommand,
        F: Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            kind: Kind::CompositeTopLevel(Arc::new(move |ctx: &AutoCommandContext<'_>| {
                Ok(Arc::new(factory(ctx)?) as Arc<dyn CompositeTopLevelCommand>)
            })),
        }
    }

    /// A leaf attached to the composite of type `P`.
    pub fn subcommand_of<T: SubCommand + Default, P: 'static>() -> Self {
        Self::subcommand_of_with::<T, P, _>(default_factory::<T>())
    }

    pub fn subcommand_of_with<T, P, F>(factory: F) -> Self
    where
        T: SubCommand,
        P: 'static,
        F: Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            kind: Kind::Sub {
                parent: type_name::<P>(),
                make: Arc::new(move |ctx: &AutoCommandContext<'_>| {
                    Ok(Arc::new(factory(ctx)?) as Arc<dyn SubCommand>)
                }),
            },
        }
    }

    /// A composite nested in the composite of type `P`.
    pub fn composite_subcommand_of<T: CompositeSubCommand + Default, P: 'static>() -> Self {
        Self::composite_subcommand_of_with::<T, P, _>(default_factory::<T>())
    }

    pub fn composite_subcommand_of_with<T, P, F>(factory: F) -> Self
    where
        T: CompositeSubCommand,
        P: 'static,
        F: Fn(&AutoCommandContext<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name::<T>(),
            kind: Kind::CompositeSub {
                parent: type_name::<P>(),
                make: Arc::new(move |ctx: &AutoCommandContext<'_>| {
                    Ok(Arc::new(factory(ctx)?) as Arc<dyn CompositeSubCommand>)
                }),
            },
        }
    }

    /// A type with no node kind. Reported as a failure by the pass.
    pub fn unmarked<T: 'static>() -> Self {
        Self {
            type_name: type_name::<T>(),
            kind: Kind::Unmarked,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Where candidates come from.
pub trait AutoCommandSource {
    fn candidates(&self) -> Vec<AutoCandidate>;
}

impl AutoCommandSource for Vec<AutoCandidate> {
    fn candidates(&self) -> Vec<AutoCandidate> {
        self.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    pub type_name: String,
    pub reason: String,
}

/// What a registration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// Host commands that received a tree.
    pub registered: Vec<String>,
    pub failed: Vec<RegistrationFailure>,
    /// Subcommands whose parent was never created.
    pub orphaned: Vec<String>,
}

impl RegistrationReport {
    fn fail(&mut self, type_name: &str, reason: impl ToString) {
        let reason = reason.to_string();
        error!(command_type = type_name, %reason, "failed to register auto command");
        self.failed.push(RegistrationFailure {
            type_name: type_name.to_string(),
            reason,
        });
    }
}

#[derive(Clone)]
enum Pending {
    Leaf(Arc<dyn SubCommand>),
    Composite(&'static str, Arc<dyn CompositeSubCommand>),
}

type PendingChildren = HashMap<&'static str, Vec<(&'static str, Pending)>>;

/// Runs a registration pass over one or more sources.
#[derive(Default)]
pub struct AutoCommandBuilder {
    sources: Vec<Box<dyn AutoCommandSource>>,
}

impl AutoCommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: impl AutoCommandSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn candidate(self, candidate: AutoCandidate) -> Self {
        self.source(vec![candidate])
    }

    pub fn register(self, registry: &mut CommandRegistry) -> RegistrationReport {
        let candidates: Vec<AutoCandidate> = self
            .sources
            .iter()
            .flat_map(|source| source.candidates())
            .collect();
        let metadata = registry.metadata().clone();
        let defaults = Arc::clone(registry.defaults());
        let ctx = AutoCommandContext {
            metadata: &metadata,
            defaults: &defaults,
        };

        let mut report = RegistrationReport::default();
        let mut pending = PendingChildren::new();
        let mut top_levels = Vec::new();

        for candidate in candidates {
            let AutoCandidate { type_name, kind } = candidate;
            match kind {
                Kind::Sub { parent, make } => match make(&ctx) {
                    Ok(command) => pending
                        .entry(parent)
                        .or_default()
                        .push((type_name, Pending::Leaf(command))),
                    Err(e) => report.fail(type_name, failed_factory(type_name, &e)),
                },
                Kind::CompositeSub { parent, make } => match make(&ctx) {
                    Ok(command) => pending
                        .entry(parent)
                        .or_default()
                        .push((type_name, Pending::Composite(type_name, command))),
                    Err(e) => report.fail(type_name, failed_factory(type_name, &e)),
                },
                Kind::Unmarked => report.fail(
                    type_name,
                    BuildError::InappropriateKind {
                        type_name: type_name.to_string(),
                        expected: "a top-level command, composite or subcommand",
                    },
                ),
                kind @ (Kind::TopLevel(_) | Kind::CompositeTopLevel(_)) => {
                    top_levels.push((type_name, kind))
                }
            }
        }

        for (type_name, kind) in top_levels {
            let registered = match kind {
                Kind::TopLevel(make) => make(&ctx)
                    .map_err(|e| failed_factory(type_name, &e))
                    .and_then(|command| {
                        let name = command.name().to_string();
                        registry.attach_top_level(command).map(|()| name)
                    }),
                Kind::CompositeTopLevel(make) => make(&ctx)
                    .map_err(|e| failed_factory(type_name, &e))
                    .and_then(|command| {
                        let name = command.name().to_string();
                        registry
                            .attach_composite_top_level_with(command.as_ref(), |builder| {
                                attach_children(builder, type_name, &mut pending)
                            })
                            .map(|()| name)
                    }),
                _ => continue,
            };

            match registered {
                Ok(name) => {
                    info!(command = %name, command_type = type_name, "registered auto command");
                    report.registered.push(name);
                }
                Err(e) => report.fail(type_name, e),
            }
        }

        for (parent, children) in pending {
            for (child, _) in children {
                warn!("{child} was never created since {parent} wasn't");
                report.orphaned.push(child.to_string());
            }
        }
        report.orphaned.sort();
        report
    }
}

fn failed_factory(type_name: &str, e: &anyhow::Error) -> BuildError {
    BuildError::FactoryFailed {
        type_name: type_name.to_string(),
        reason: format!("{e:#}"),
    }
}

fn attach_children(
    builder: &mut CompositeCommandBuilder,
    parent: &'static str,
    pending: &mut PendingChildren,
) -> Result<(), BuildError> {
    let Some(children) = pending.remove(parent) else {
        return Ok(());
    };
    for (_, child) in children {
        match child {
            Pending::Leaf(command) => {
                builder.subcommand_arc(command)?;
            }
            Pending::Composite(type_name, command) => {
                builder.composite_subcommand_with(command, |nested| {
                    attach_children(nested, type_name, pending)
                })?;
            }
        }
    }
    Ok(())
}
