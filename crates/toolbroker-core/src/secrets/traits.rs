//! Core traits and types for secret storage

use thiserror::Error;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Secret not found: {0}")]
    NotFound(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// A source of secrets keyed by name
pub trait SecretStore: Send + Sync {
    /// Store name for diagnostics (e.g. "env", "memory")
    fn name(&self) -> &str;

    /// Get a secret value, `None` if absent or empty
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret value
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Read a secret that must be present
///
/// Used at startup for the LLM credential; absence is reported as
/// `SecretStoreError::NotFound` and callers treat it as fatal.
pub fn require_secret(store: &dyn SecretStore, key: &str) -> SecretStoreResult<String> {
    store
        .get(key)
        .ok_or_else(|| SecretStoreError::NotFound(key.to_string()))
}
