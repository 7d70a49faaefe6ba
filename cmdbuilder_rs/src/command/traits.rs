//! Self-describing commands.
//!
//! Implement these on an [`Executable`] to have it built into a tree without
//! spelling out its parsers: `configure` defaults to inferring them from the
//! signature, and description, usage and permission default to the fallback
//! metadata.

use std::sync::Arc;

use super::builder::CommandBuilder;
use super::composite::{CompositeCommand, CompositeCommandBuilder};
use super::leaf::LeafCommand;
use super::Property;
use crate::callback::{CommandCallback, Executable, ExecutableCallback};
use crate::error::BuildError;
use crate::inference::DefaultInferenceProvider;
use crate::metadata::CommandMetadata;

/// A leaf under a composite.
pub trait SubCommand: Executable {
    fn name(&self) -> &str;

    fn description(&self) -> Property<String> {
        Property::Deferred
    }

    fn usage(&self) -> Property<String> {
        Property::Deferred
    }

    fn permission(&self) -> Property<String> {
        Property::Deferred
    }

    fn configure(&self, builder: &mut CommandBuilder) -> Result<(), BuildError> {
        builder.infer(self)?;
        Ok(())
    }

    fn callback(self: Arc<Self>) -> Arc<dyn CommandCallback> {
        Arc::new(ExecutableCallback::from_arc(self))
    }
}

/// A composite under another composite.
pub trait CompositeSubCommand: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> Property<String> {
        Property::Deferred
    }

    fn permission(&self) -> Property<String> {
        Property::Deferred
    }

    fn configure(&self, builder: &mut CompositeCommandBuilder) -> Result<(), BuildError> {
        let _ = builder;
        Ok(())
    }
}

/// A leaf attached directly to a host command.
pub trait TopLevelCommand: Executable {
    fn name(&self) -> &str;

    fn configure(&self, builder: &mut CommandBuilder) -> Result<(), BuildError> {
        builder.infer(self)?;
        Ok(())
    }

    fn callback(self: Arc<Self>) -> Arc<dyn CommandCallback> {
        Arc::new(ExecutableCallback::from_arc(self))
    }
}

/// A composite attached directly to a host command.
pub trait CompositeTopLevelCommand: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn configure(&self, builder: &mut CompositeCommandBuilder) -> Result<(), BuildError> {
        let _ = builder;
        Ok(())
    }
}

pub fn build_top_level(
    command: Arc<dyn TopLevelCommand>,
    defaults: Arc<DefaultInferenceProvider>,
) -> Result<LeafCommand, BuildError> {
    let mut builder = CommandBuilder::with_defaults(defaults);
    command.configure(&mut builder)?;
    builder.build(command.callback())
}

/// Build `command` with `metadata` as the fallback for its children.
pub fn build_composite_top_level(
    command: &dyn CompositeTopLevelCommand,
    metadata: CommandMetadata,
    defaults: Arc<DefaultInferenceProvider>,
) -> Result<CompositeCommand, BuildError> {
    build_composite_top_level_with(command, metadata, defaults, |_| Ok(()))
}

pub(crate) fn build_composite_top_level_with<F>(
    command: &dyn CompositeTopLevelCommand,
    metadata: CommandMetadata,
    defaults: Arc<DefaultInferenceProvider>,
    extend: F,
) -> Result<CompositeCommand, BuildError>
where
    F: FnOnce(&mut CompositeCommandBuilder) -> Result<(), BuildError>,
{
    let mut builder = CompositeCommandBuilder::with_defaults(defaults);
    builder.with_metadata(metadata)?;
    command.configure(&mut builder)?;
    extend(&mut builder)?;
    Ok(builder.build())
}
