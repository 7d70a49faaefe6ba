//! Fallback metadata for command descriptions, usages and permissions.
//!
//! Loads an optional `.cmdb/commands.toml` from the project root. Each
//! top-level `[commands.<name>]` table is a command the host declares; nested
//! `subcommands` tables follow the command tree.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::MetadataError;

/// Description, usage and permission for one command, plus its children.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandMetadata {
    pub description: Option<String>,
    pub usage: Option<String>,
    pub permission: Option<String>,
    pub subcommands: BTreeMap<String, CommandMetadata>,
}

impl CommandMetadata {
    pub fn subcommand(&self, name: &str) -> Option<&CommandMetadata> {
        self.subcommands.get(name)
    }
}

/// Root of the metadata document.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetadataFile {
    pub commands: BTreeMap<String, CommandMetadata>,
}

impl MetadataFile {
    /// Load `.cmdb/commands.toml` under `root`.
    /// Returns empty metadata if the file doesn't exist or is invalid.
    pub fn load(root: &Path) -> Self {
        let path = root.join(".cmdb").join("commands.toml");
        Self::load_from_path(&path)
    }

    /// Load from a specific path, warning and falling back to empty metadata
    /// when it can't be read or parsed.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::try_load_from_path(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("{e}");
                Self::default()
            }
        }
    }

    /// Strict variant of [`load_from_path`](Self::load_from_path).
    pub fn try_load_from_path(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn command(&self, name: &str) -> Option<&CommandMetadata> {
        self.commands.get(name)
    }

    /// Entry at `path`, root command first.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&CommandMetadata> {
        let (root, rest) = path.split_first()?;
        rest.iter().try_fold(self.command(root.as_ref())?, |entry, name| {
            entry.subcommand(name.as_ref())
        })
    }
}
