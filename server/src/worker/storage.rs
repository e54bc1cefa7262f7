use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// In-process stand-in for the browser's `localStorage`.
///
/// The host seeds it with a snapshot of its own storage; tooling in the
/// worker process reads and writes it the way page scripts would.
#[derive(Debug, Default)]
pub struct LocalStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole store with `data`.
    ///
    /// String values are stored as is, other values as their JSON text. A
    /// payload that is not an object leaves the store empty.
    pub fn init(&self, data: &Value) {
        let items = match data {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (key.clone(), value)
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        *self.items.write() = items;
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.items.write().insert(key.into(), value.into());
    }

    pub fn remove_item(&self, key: &str) {
        self.items.write().remove(key);
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Name of the `index`-th key, in key order.
    pub fn key(&self, index: usize) -> Option<String> {
        self.items.read().keys().nth(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
