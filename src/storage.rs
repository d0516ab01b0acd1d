//! Local key-value storage, kept deliberately thin: the peer core only
//! needs get/put/remove/keys.

use std::collections::HashMap;
use std::sync::Mutex;

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn remove(&self, key: &str) -> Option<String>;
    fn keys(&self) -> Vec<String>;
}

/// In-memory map-backed storage. No persistence.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: String) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let storage = MemoryStorage::new();
        storage.put("x", "1".to_string());
        assert_eq!(storage.get("x"), Some("1".to_string()));
        assert_eq!(storage.get("missing"), None);
    }

    #[test]
    fn keys_lists_everything_stored() {
        let storage = MemoryStorage::new();
        storage.put("a", "1".to_string());
        storage.put("b", "2".to_string());
        let mut keys = storage.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
