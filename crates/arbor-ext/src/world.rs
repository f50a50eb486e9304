//! Shared environment state handed to extensions at initialization.

use std::collections::BTreeMap;

/// A flat key-value bag of environment-wide facts.
///
/// Extensions read from it in [`initialize`] to acquire whatever context
/// they need; the owning environment writes to it before merging.
///
/// [`initialize`]: crate::Extension::initialize
#[derive(Debug, Default)]
pub struct WorldState {
    entries: BTreeMap<String, serde_json::Value>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fact under `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    /// Look up a fact by key.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut world = WorldState::new();
        assert!(world.is_empty());
        world.set("workspace", serde_json::json!("/src/project"));
        assert!(world.contains("workspace"));
        assert_eq!(
            world.get("workspace"),
            Some(&serde_json::json!("/src/project"))
        );
        assert_eq!(world.get("missing"), None);
    }

    #[test]
    fn set_replaces() {
        let mut world = WorldState::new();
        world.set("rev", serde_json::json!(1));
        world.set("rev", serde_json::json!(2));
        assert_eq!(world.get("rev"), Some(&serde_json::json!(2)));
    }
}
