//! Key-value settings store with default-merge semantics

use super::settings::ExtensionSettings;
use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;

/// A host-provided store of JSON objects keyed by extension name
pub trait SettingsStore: Send + Sync {
    /// Read the object stored under `key`, if any
    fn load(&self, key: &str) -> Option<Map<String, Value>>;

    /// Replace the object stored under `key`
    fn save(&self, key: &str, value: Map<String, Value>) -> Result<()>;
}

/// In-memory store, used by the CLI and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, key: &str) -> Option<Map<String, Value>> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, value: Map<String, Value>) -> Result<()> {
        self.entries.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Fill keys missing from `target` with the values in `defaults`.
/// Existing keys are never touched. Returns true when anything was added.
pub fn merge_defaults(target: &mut Map<String, Value>, defaults: &Map<String, Value>) -> bool {
    let mut changed = false;
    for (key, value) in defaults {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

impl ExtensionSettings {
    /// Store key for these settings
    pub const STORE_KEY: &'static str = "chub";

    /// Read settings from `store`, filling and persisting any missing keys
    pub fn load_or_init(store: &dyn SettingsStore) -> Result<Self> {
        let defaults = match serde_json::to_value(Self::default())? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut stored = store.load(Self::STORE_KEY).unwrap_or_default();
        if merge_defaults(&mut stored, &defaults) {
            store.save(Self::STORE_KEY, stored.clone())?;
        }

        Ok(serde_json::from_value(Value::Object(stored))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_merge_defaults_keeps_existing() {
        let mut target = object(json!({"findCount": 25}));
        let defaults = object(json!({"findCount": 10, "nsfw": false}));

        assert!(merge_defaults(&mut target, &defaults));
        assert_eq!(target["findCount"], json!(25));
        assert_eq!(target["nsfw"], json!(false));
        assert!(!merge_defaults(&mut target, &defaults));
    }

    #[test]
    fn test_load_or_init_empty_store() {
        let store = MemoryStore::new();
        let settings = ExtensionSettings::load_or_init(&store).unwrap();

        assert_eq!(settings, ExtensionSettings::default());
        let saved = store.load(ExtensionSettings::STORE_KEY).unwrap();
        assert_eq!(saved["findCount"], json!(10));
        assert_eq!(saved["nsfw"], json!(false));
    }

    #[test]
    fn test_load_or_init_partial_store() {
        let store = MemoryStore::new();
        store
            .save(ExtensionSettings::STORE_KEY, object(json!({"nsfw": true, "theme": "dark"})))
            .unwrap();

        let settings = ExtensionSettings::load_or_init(&store).unwrap();
        assert!(settings.nsfw);
        assert_eq!(settings.find_count, 10);

        let saved = store.load(ExtensionSettings::STORE_KEY).unwrap();
        assert_eq!(saved["theme"], json!("dark"));
    }
}
