//! Values named by configuration before their variable exists.

use std::collections::HashMap;

/// A buffered configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayEntry {
    /// Value text as it appeared in the configuration.
    pub text: String,
    /// Whether it was recorded while a group preset was being applied.
    pub in_group_scope: bool,
}

/// Pending values keyed by lowercase variable name.
///
/// Entries are applied when the variable registers and kept afterwards, so a
/// variable registered again picks the value up once more. Recording the same
/// name twice keeps the last value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverlay {
    entries: HashMap<String, OverlayEntry>,
}

impl ConfigOverlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `text` for `name`, replacing any earlier value.
    pub fn record(&mut self, name: &str, text: impl Into<String>, in_group_scope: bool) {
        self.entries.insert(
            name.to_ascii_lowercase(),
            OverlayEntry {
                text: text.into(),
                in_group_scope,
            },
        );
    }

    /// Peek at the entry for `name`.
    pub fn get(&self, name: &str) -> Option<&OverlayEntry> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    /// Number of pending entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut overlay = ConfigOverlay::new();
        overlay.record("r_Width", "800", false);
        overlay.record("R_WIDTH", "1024", true);

        assert_eq!(overlay.len(), 1);
        assert_eq!(
            overlay.get("r_width"),
            Some(&OverlayEntry {
                text: "1024".into(),
                in_group_scope: true
            })
        );
    }
}
