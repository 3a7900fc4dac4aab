//! Persistence layer for console configuration.
//!
//! Provides RON documents holding variable values, variable group definitions
//! and template commands, a file-backed script source for `exec`, and the
//! `host_writeconfig` command.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{
    CommandAction, ConCommand, ConVarFlags, ConfigSink, ConfigSource, Console, ConsoleError,
    LogLevel, ScriptSource,
};

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "console.ron";

/// Extension tried for `exec` scripts named without one.
pub const SCRIPT_EXTENSION: &str = "cfg";

/// A variable group as written in a config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GroupDefinition {
    /// Help text of the group variable.
    #[serde(default)]
    pub help: String,
    /// State selected at registration.
    #[serde(default)]
    pub default_state: Option<i64>,
    /// Values shared by every state unless a state overrides them.
    #[serde(default)]
    pub default: BTreeMap<String, String>,
    /// Values per state id.
    #[serde(default)]
    pub states: BTreeMap<i64, BTreeMap<String, String>>,
}

impl ConfigSource for GroupDefinition {
    fn ingest(&self, sink: &mut dyn ConfigSink) {
        if let Some(state) = self.default_state {
            sink.on_entry("", &state.to_string(), Some("default"));
        }
        for (key, value) in &self.default {
            sink.on_entry(key, value, Some("default"));
        }
        for (id, values) in &self.states {
            let tag = id.to_string();
            for (key, value) in values {
                sink.on_entry(key, value, Some(&tag));
            }
        }
    }
}

/// Serializable console configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsoleConfigFile {
    /// Variable values (name -> text).
    #[serde(default)]
    pub cvars: BTreeMap<String, String>,
    /// Variable groups (group name -> definition).
    #[serde(default)]
    pub groups: BTreeMap<String, GroupDefinition>,
    /// Template commands (name -> template text).
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl ConfigSource for ConsoleConfigFile {
    fn ingest(&self, sink: &mut dyn ConfigSink) {
        for (key, value) in &self.cvars {
            sink.on_entry(key, value, None);
        }
    }
}

impl ConsoleConfigFile {
    /// Create a new empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from RON text.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        ron::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&contents, &path.display().to_string())
    }

    /// Save config to a RON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let contents = ron::ser::to_string_pretty(self, pretty)?;

        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load config from file, returning default if file doesn't exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Collect the values worth writing back from a console.
    ///
    /// Variables that came from configuration or were changed since
    /// registration are kept, unless they are protected or invisible.
    /// Template commands are kept as aliases.
    pub fn from_console(console: &Console) -> Self {
        let mut config = Self::new();

        for (_, var) in console.vars().iter() {
            let flags = var.get_flags();
            let touched = flags.intersects(ConVarFlags::WAS_IN_CONFIG | ConVarFlags::MODIFIED);
            if touched && !flags.is_protected() && !flags.contains(ConVarFlags::INVISIBLE) {
                config.cvars.insert(var.name().to_string(), var.get_string());
            }
        }

        for command in console.commands().iter() {
            if let CommandAction::Template(text) = command.action() {
                config.aliases.insert(command.name().to_string(), text.clone());
            }
        }

        config
    }

    /// Apply this config to a console.
    ///
    /// Plain values are ingested first, so a group named in `cvars` starts in
    /// that state once it registers. Groups and aliases that clash with
    /// existing names are skipped with a warning.
    pub fn apply(&self, console: &mut Console) {
        console.load_config(self);

        for (name, group) in &self.groups {
            if let Err(e) = console.register_group(name, &group.help, ConVarFlags::empty(), group) {
                warn!(target: "cvars", "config group '{}' skipped: {}", name, e);
            }
        }

        for (name, text) in &self.aliases {
            let alias = ConCommand::template(name.as_str(), text.as_str());
            if let Err(e) = console.register_command(alias) {
                warn!(target: "cvars", "config alias '{}' skipped: {}", name, e);
            }
        }
    }
}

/// Errors that can occur during config operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing a file failed.
    #[error("IO error for '{path}': {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid config document.
    #[error("Parse error for '{path}': {source}")]
    Parse {
        /// File the text came from.
        path: String,
        /// Underlying error.
        #[source]
        source: ron::error::SpannedError,
    },
    /// The config could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Script source reading `exec` scripts from a directory.
///
/// A name without an extension gets [`SCRIPT_EXTENSION`]. Absolute names
/// and names with `..` components are refused, so scripts stay under the root.
#[derive(Debug, Clone)]
pub struct FileScriptSource {
    root: PathBuf,
}

impl FileScriptSource {
    /// Read scripts relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let inside_root = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !inside_root {
            return None;
        }

        let mut path = self.root.join(relative);
        if path.extension().is_none() {
            path.set_extension(SCRIPT_EXTENSION);
        }
        Some(path)
    }
}

impl ScriptSource for FileScriptSource {
    fn read_script(&self, name: &str) -> Option<String> {
        let Some(path) = self.resolve(name) else {
            warn!(target: "cvars", "script name '{}' leaves the script directory", name);
            return None;
        };
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(target: "cvars", "cannot read script '{}': {}", path.display(), e);
                None
            }
        }
    }
}

/// Resource tracking the config file path.
#[derive(Resource, Debug, Clone)]
pub struct ConfigPath(pub PathBuf);

impl Default for ConfigPath {
    fn default() -> Self {
        Self(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Save a console's config to `path`.
pub fn save_config(console: &Console, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    ConsoleConfigFile::from_console(console).save(path)
}

/// Register `host_writeconfig`, saving to `default_path` unless given a file name.
pub fn register_commands(
    console: &mut Console,
    default_path: impl Into<PathBuf>,
) -> Result<(), ConsoleError> {
    let default_path = default_path.into();
    let command = ConCommand::new("host_writeconfig", move |args, console| {
        let path = args.get(0).map_or_else(|| default_path.clone(), PathBuf::from);

        match save_config(console, &path) {
            Ok(()) => console.print(format!("Saved config to '{}'", path.display())),
            Err(e) => console.report(LogLevel::Error, &format!("Failed to save config: {}", e)),
        }
    })
    .help("Save configured and modified cvars to the config file");

    console.register_command(command)
}

/// System to load config on startup.
pub fn load_config_on_startup(mut console: ResMut<Console>, config_path: Res<ConfigPath>) {
    let path = &config_path.0;

    if !path.exists() {
        info!("No config file found at '{}', using defaults", path.display());
        return;
    }

    match ConsoleConfigFile::load(path) {
        Ok(config) => {
            info!("Loading config from '{}'", path.display());
            config.apply(&mut console);
            info!(
                "Loaded {} cvars, {} groups and {} aliases",
                config.cvars.len(),
                config.groups.len(),
                config.aliases.len()
            );
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
        }
    }
}
