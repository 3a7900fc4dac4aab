//! Storage for console variables.
//!
//! Variables live in a slot map and are addressed by [`ConVarHandle`]. Names
//! are indexed case-insensitively through a [`Trie`] keyed by the lowercase
//! name, which also gives sorted prefix iteration for listings and completion.

use slotmap::{new_key_type, SlotMap};

use super::{ConVar, ConVarFlags, Trie};

new_key_type! {
    /// Stable handle to a registered variable.
    ///
    /// Handles of unregistered variables never resolve again, even if a new
    /// variable with the same name is registered later.
    pub struct ConVarHandle;
}

/// Check that `name` is usable as a console name.
///
/// Names start with an ASCII letter or `_` and continue with ASCII letters,
/// digits, `_` or `.`.
pub fn is_valid_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(c) if c.is_ascii_alphabetic() || c == b'_' => {}
        _ => return false,
    }
    bytes.all(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'.')
}

/// Registry of console variables.
///
/// The registry only stores; registration side effects (config overlay,
/// gating, callbacks) are driven by [`Console`](super::Console).
#[derive(Default)]
pub struct ConVarRegistry {
    vars: SlotMap<ConVarHandle, ConVar>,
    names: Trie<ConVarHandle>,
}

impl ConVarRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable.
    ///
    /// Returns `Err` with the existing handle if the name is taken; the
    /// existing variable is left untouched.
    pub fn insert(&mut self, var: ConVar) -> Result<ConVarHandle, ConVarHandle> {
        let key = var.name().to_ascii_lowercase();
        if let Some(&existing) = self.names.get(&key) {
            return Err(existing);
        }
        let handle = self.vars.insert(var);
        self.names.insert(&key, handle);
        Ok(handle)
    }

    /// Remove a variable by name.
    pub fn remove(&mut self, name: &str) -> Option<ConVar> {
        let handle = self.names.remove(&name.to_ascii_lowercase())?;
        self.vars.remove(handle)
    }

    /// Case-insensitive exact lookup.
    pub fn lookup(&self, name: &str) -> Option<ConVarHandle> {
        self.names.get(&name.to_ascii_lowercase()).copied()
    }

    /// Get a variable by handle.
    #[inline]
    pub fn get(&self, handle: ConVarHandle) -> Option<&ConVar> {
        self.vars.get(handle)
    }

    /// Get a mutable variable by handle.
    #[inline]
    pub fn get_mut(&mut self, handle: ConVarHandle) -> Option<&mut ConVar> {
        self.vars.get_mut(handle)
    }

    /// Get a variable by name.
    pub fn get_by_name(&self, name: &str) -> Option<&ConVar> {
        self.get(self.lookup(name)?)
    }

    /// Check if a variable exists.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Get the number of variables.
    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables whose name starts with `prefix` (case-insensitive), sorted by name.
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn prefix_iter<'a>(
        &'a self,
        prefix: &str,
    ) -> impl Iterator<Item = (ConVarHandle, &'a ConVar)> + Clone + use<'a> {
        self.names
            .prefix_iter(&prefix.to_ascii_lowercase())
            .filter_map(|(_, &handle)| self.vars.get(handle).map(|var| (handle, var)))
    }

    /// All variables, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (ConVarHandle, &ConVar)> + Clone {
        self.prefix_iter("")
    }

    /// Number of variables not flagged `INVISIBLE`.
    pub fn visible_count(&self) -> usize {
        self.vars
            .values()
            .filter(|var| !var.get_flags().contains(ConVarFlags::INVISIBLE))
            .count()
    }

    /// Visible variables whose name contains `needle` (case-insensitive), sorted by name.
    pub fn search(&self, needle: &str) -> Vec<&ConVar> {
        let needle = needle.to_ascii_lowercase();
        self.iter()
            .map(|(_, var)| var)
            .filter(|var| !var.get_flags().contains(ConVarFlags::INVISIBLE))
            .filter(|var| var.name().to_ascii_lowercase().contains(&needle))
            .collect()
    }

    /// Handles of all variables in name order.
    pub fn handles(&self) -> Vec<ConVarHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_insert_lookup() {
        let mut registry = ConVarRegistry::new();
        let handle = registry.insert(ConVar::new("sv_Gravity", 800.0f32)).unwrap();

        assert_eq!(registry.lookup("SV_GRAVITY"), Some(handle));
        assert_eq!(registry.get(handle).map(|v| v.name()), Some("sv_Gravity"));
        assert!(registry.contains("sv_gravity"));
        assert!(!registry.contains("sv_gravit"));
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut registry = ConVarRegistry::new();
        let first = registry.insert(ConVar::new("test_var", 42)).unwrap();

        let err = registry.insert(ConVar::new("TEST_VAR", 100)).unwrap_err();
        assert_eq!(err, first);
        assert_eq!(registry.get(first).map(ConVar::get_int), Some(42));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_invalidates_handle() {
        let mut registry = ConVarRegistry::new();
        let handle = registry.insert(ConVar::new("a", 1)).unwrap();

        assert!(registry.remove("A").is_some());
        assert!(registry.get(handle).is_none());
        assert!(registry.remove("a").is_none());

        let again = registry.insert(ConVar::new("a", 2)).unwrap();
        assert_ne!(again, handle);
    }

    #[test]
    fn test_prefix_iter_sorted_case_insensitive() {
        let mut registry = ConVarRegistry::new();
        registry.insert(ConVar::new("sv_gravity", 800.0f32)).unwrap();
        registry.insert(ConVar::new("SV_Cheats", 0)).unwrap();
        registry.insert(ConVar::new("cl_fov", 90)).unwrap();

        let names: Vec<_> = registry.prefix_iter("Sv_").map(|(_, v)| v.name()).collect();
        assert_eq!(names, vec!["SV_Cheats", "sv_gravity"]);

        let iter = registry.prefix_iter("");
        assert_eq!(iter.clone().count(), 3);
        assert_eq!(iter.count(), 3);
    }

    #[test]
    fn test_search_skips_invisible() {
        let mut registry = ConVarRegistry::new();
        registry.insert(ConVar::new("r_width", 1024)).unwrap();
        registry.insert(ConVar::new("r_height", 768)).unwrap();
        registry
            .insert(ConVar::new("r_secret_width", 1).flags(ConVarFlags::INVISIBLE))
            .unwrap();

        let found: Vec<_> = registry.search("WIDTH").into_iter().map(ConVar::name).collect();
        assert_eq!(found, vec!["r_width"]);
        assert_eq!(registry.visible_count(), 2);
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("sv_gravity"));
        assert!(is_valid_name("_private.sub"));
        assert!(is_valid_name("r2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2fast"));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("semi;colon"));
    }
}
