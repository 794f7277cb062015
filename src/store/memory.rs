use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{SecretStore, StoreError};

/// In-process store. Values are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no keys are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn update(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(value) => {
                values.insert(key.to_string(), value.to_string());
            }
            None => {
                values.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_then_get_returns_value() {
        let store = MemoryStore::new();
        store.update("credentials", Some("{}")).unwrap();
        assert_eq!(store.get("credentials").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_update_none_removes_key() {
        let store = MemoryStore::new();
        store.update("cookieJar", Some("blob")).unwrap();
        store.update("cookieJar", None).unwrap();
        assert!(store.get("cookieJar").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("anything").unwrap().is_none());
    }
}
