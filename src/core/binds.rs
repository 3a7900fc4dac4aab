//! Key bindings: names mapped to command text.

use std::collections::BTreeMap;

/// Binding table filled by the `bind` command.
///
/// The first binding for a name is kept; later binds of the same name are
/// ignored.
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    binds: BTreeMap<String, String>,
}

impl KeyBindings {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `command` unless it is already bound. Returns whether it was added.
    pub fn bind(&mut self, name: &str, command: impl Into<String>) -> bool {
        match self.binds.entry(name.to_string()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(command.into());
                true
            }
        }
    }

    /// Remove a binding.
    pub fn unbind(&mut self, name: &str) -> Option<String> {
        self.binds.remove(name)
    }

    /// Command text bound to `name`.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.binds.get(name).map(String::as_str)
    }

    /// Bindings sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.binds.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.binds.len()
    }

    /// Check if there are no bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }
}
