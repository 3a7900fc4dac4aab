//! Configuration ingestion.
//!
//! Configuration arrives as push-style `(key, value, group)` triples. Files,
//! command lines and tests all feed the console through [`ConfigSource`]; the
//! console never parses configuration text itself.

use super::{ConVarFlags, Console, LogLevel};

/// Receiver of configuration triples.
pub trait ConfigSink {
    /// One entry. `group` is `None` for plain variable assignments.
    fn on_entry(&mut self, key: &str, value: &str, group: Option<&str>);
}

/// Producer of configuration triples.
pub trait ConfigSource {
    /// Push every entry into `sink`, in source order.
    fn ingest(&self, sink: &mut dyn ConfigSink);
}

/// One configuration triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Variable name, or empty for a group's default state marker.
    pub key: String,
    /// Value text.
    pub value: String,
    /// Group tag: `"default"` or a decimal state id.
    pub group: Option<String>,
}

/// In-memory configuration source.
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::{ConfigEntries, Console, ConVar};
///
/// let mut console = Console::new();
/// console.load_config(&ConfigEntries::new().with("r_width", "1024"));
///
/// // Registered later, but the configured value wins over the default
/// let handle = console.register_var(ConVar::new("r_width", 800)).unwrap();
/// assert_eq!(console.get_int(handle), Some(1024));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigEntries {
    entries: Vec<ConfigEntry>,
}

impl ConfigEntries {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain assignment.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value, None);
        self
    }

    /// Add an entry tagged with a group section.
    pub fn with_group(
        mut self,
        group: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.push(key, value, Some(group.into()));
        self
    }

    /// Append an entry.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>, group: Option<String>) {
        self.entries.push(ConfigEntry {
            key: key.into(),
            value: value.into(),
            group,
        });
    }

    /// The entries in source order.
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }
}

impl ConfigSource for ConfigEntries {
    fn ingest(&self, sink: &mut dyn ConfigSink) {
        for entry in &self.entries {
            sink.on_entry(&entry.key, &entry.value, entry.group.as_deref());
        }
    }
}

struct Ingest<'a>(&'a mut Console);

impl ConfigSink for Ingest<'_> {
    fn on_entry(&mut self, key: &str, value: &str, group: Option<&str>) {
        match group {
            None => self.0.assign_from_config(key, value),
            Some(tag) => self.0.log.log(
                LogLevel::Warning,
                &format!("[CVARS]: [CONFIG] entry [{}] in group section [{}] outside a cvar group definition", key, tag),
            ),
        }
    }
}

impl Console {
    /// Ingest plain variable assignments from `source`.
    ///
    /// Registered variables are set through the gated path and marked
    /// `WAS_IN_CONFIG` when the change is accepted. Unknown names are buffered
    /// and applied when the variable registers.
    pub fn load_config(&mut self, source: &dyn ConfigSource) {
        source.ingest(&mut Ingest(self));
    }

    pub(crate) fn assign_from_config(&mut self, name: &str, text: &str) {
        let Some(handle) = self.vars.lookup(name) else {
            let in_group_scope = self.gate.in_group_scope();
            self.overlay.record(name, text, in_group_scope);
            return;
        };

        if self.set_from_text(handle, text).is_ok() {
            if let Some(var) = self.vars.get_mut(handle) {
                var.insert_flags(ConVarFlags::WAS_IN_CONFIG);
            }
        }
    }
}
