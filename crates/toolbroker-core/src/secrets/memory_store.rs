//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory secret store for testing and embedding
///
/// # Example
///
/// ```
/// use toolbroker_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::new();
/// store.store("LLM_API_KEY", "sk-test").unwrap();
/// assert_eq!(store.get("LLM_API_KEY"), Some("sk-test".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial values
    pub fn with_secrets(initial: HashMap<String, String>) -> Self {
        Self {
            secrets: RwLock::new(initial),
        }
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets
            .read()
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}
