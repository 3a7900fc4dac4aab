//! Ordered prefix tree keyed by byte strings.
//!
//! Children are kept in byte order, so iteration yields keys sorted
//! lexicographically. This backs both name lookup and sorted prefix listing.

use std::collections::BTreeMap;

/// A trie (prefix tree) with sorted iteration.
///
/// # Complexity
///
/// - `get`, `insert`, `remove`: O(k log a) where k = key length, a = alphabet fan-out
/// - `prefix_iter`: O(k) to start, then amortized O(1) per visited node
///
/// # Examples
///
/// ```
/// use bevy_cvar_console::core::Trie;
///
/// let mut trie = Trie::new();
/// trie.insert("sv_gravity", 800);
/// trie.insert("sv_cheats", 0);
/// trie.insert("cl_fov", 90);
///
/// let keys: Vec<_> = trie.prefix_iter("sv_").map(|(k, _)| k).collect();
/// assert_eq!(keys, vec!["sv_cheats", "sv_gravity"]);
/// ```
#[derive(Debug, Clone)]
pub struct Trie<V> {
    root: TrieNode<V>,
    len: usize,
}

#[derive(Debug, Clone)]
struct TrieNode<V> {
    children: BTreeMap<u8, TrieNode<V>>,
    entry: Option<(Box<str>, V)>,
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
            entry: None,
        }
    }
}

impl<V> TrieNode<V> {
    fn is_vacant(&self) -> bool {
        self.entry.is_none() && self.children.is_empty()
    }

    fn remove(&mut self, key: &[u8]) -> Option<V> {
        let Some((&first, rest)) = key.split_first() else {
            return self.entry.take().map(|(_, v)| v);
        };

        let child = self.children.get_mut(&first)?;
        let removed = child.remove(rest);
        if child.is_vacant() {
            self.children.remove(&first);
        }
        removed
    }
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    /// Create a new empty trie.
    pub fn new() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }

    /// Get the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the trie is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a key-value pair, returning the previous value for the key.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let mut node = &mut self.root;
        for &byte in key.as_bytes() {
            node = node.children.entry(byte).or_default();
        }

        let old = node.entry.replace((key.into(), value)).map(|(_, v)| v);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    fn node(&self, key: &str) -> Option<&TrieNode<V>> {
        let mut node = &self.root;
        for &byte in key.as_bytes() {
            node = node.children.get(&byte)?;
        }
        Some(node)
    }

    /// Get a reference to the value for the given key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.node(key)?.entry.as_ref().map(|(_, v)| v)
    }

    /// Get a mutable reference to the value for the given key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let mut node = &mut self.root;
        for &byte in key.as_bytes() {
            node = node.children.get_mut(&byte)?;
        }
        node.entry.as_mut().map(|(_, v)| v)
    }

    /// Check if the trie contains the given key.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, pruning branches that become empty.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.root.remove(key.as_bytes());
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Iterate in key order over all entries whose key starts with `prefix`.
    ///
    /// The iterator borrows only the trie, so it can be cloned to restart.
    pub fn prefix_iter(&self, prefix: &str) -> PrefixIter<'_, V> {
        PrefixIter {
            stack: self.node(prefix).into_iter().collect(),
        }
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> PrefixIter<'_, V> {
        self.prefix_iter("")
    }

    /// Iterate over all values in key order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

/// Iterator over entries sharing a prefix, in key order.
#[derive(Debug)]
pub struct PrefixIter<'a, V> {
    stack: Vec<&'a TrieNode<V>>,
}

impl<V> Clone for PrefixIter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

impl<'a, V> Iterator for PrefixIter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            // Reverse so the smallest child is visited first
            self.stack.extend(node.children.values().rev());

            if let Some((key, value)) = &node.entry {
                return Some((&**key, value));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trie_basic() {
        let mut trie = Trie::new();
        assert!(trie.is_empty());

        trie.insert("hello", 1);
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.get("hello"), Some(&1));
        assert_eq!(trie.get("hell"), None);
        assert!(!trie.contains("world"));
    }

    #[test]
    fn test_trie_overwrite() {
        let mut trie = Trie::new();
        assert_eq!(trie.insert("key", 1), None);
        assert_eq!(trie.insert("key", 2), Some(1));
        assert_eq!(trie.get("key"), Some(&2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_trie_remove_prunes() {
        let mut trie = Trie::new();
        trie.insert("test", 1);
        trie.insert("testing", 2);

        assert_eq!(trie.remove("testing"), Some(2));
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.prefix_iter("testi").count(), 0);
        assert_eq!(trie.get("test"), Some(&1));

        assert_eq!(trie.remove("nonexistent"), None);
        assert_eq!(trie.remove("tes"), None);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_trie_sorted_iteration() {
        let mut trie = Trie::new();
        for key in ["sv_maxrate", "cl_fov", "sv_cheats", "sv_", "sv_gravity", "a"] {
            trie.insert(key, ());
        }

        let keys: Vec<_> = trie.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "cl_fov", "sv_", "sv_cheats", "sv_gravity", "sv_maxrate"]);

        let keys: Vec<_> = trie.prefix_iter("sv_").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["sv_", "sv_cheats", "sv_gravity", "sv_maxrate"]);

        assert_eq!(trie.prefix_iter("xyz").count(), 0);
    }

    #[test]
    fn test_prefix_iter_restartable() {
        let mut trie = Trie::new();
        trie.insert("ab", 1);
        trie.insert("ac", 2);

        let iter = trie.prefix_iter("a");
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_trie_get_mut() {
        let mut trie = Trie::new();
        trie.insert("key", 1);
        if let Some(v) = trie.get_mut("key") {
            *v = 42;
        }
        assert_eq!(trie.get("key"), Some(&42));
    }
}
