//! Script lookup for the `exec` command.

use std::collections::HashMap;

/// Supplies the text of named scripts.
///
/// Reading is left to the host: files, packed assets or embedded strings.
pub trait ScriptSource: Send + Sync {
    /// Text of the script called `name`, or `None` if there is no such script.
    fn read_script(&self, name: &str) -> Option<String>;
}

/// In-memory scripts keyed case-insensitively by name.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{ScriptLibrary, ScriptSource};
///
/// let scripts = ScriptLibrary::new().with("autoexec", "r_fog 0\nwait_frames 1");
/// assert!(scripts.read_script("AutoExec").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    scripts: HashMap<String, String>,
}

impl ScriptLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script, builder style.
    pub fn with(mut self, name: &str, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a script.
    pub fn insert(&mut self, name: &str, text: impl Into<String>) {
        self.scripts.insert(name.to_ascii_lowercase(), text.into());
    }
}

impl ScriptSource for ScriptLibrary {
    fn read_script(&self, name: &str) -> Option<String> {
        self.scripts.get(&name.to_ascii_lowercase()).cloned()
    }
}
