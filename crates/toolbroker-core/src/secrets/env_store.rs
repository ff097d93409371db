//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Mapping from provider names to environment variable names
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("llm", vec!["LLM_API_KEY"]);
    m.insert("openai", vec!["OPENAI_API_KEY", "LLM_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m
});

/// Secret store that reads from environment variables
///
/// This store is read-only. Keys are tried as a literal variable name first,
/// then through the provider mapping (`openai` → `OPENAI_API_KEY`), then as
/// `<KEY>_API_KEY`. Empty values count as absent.
///
/// # Example
///
/// ```
/// use toolbroker_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// let key = store.get("LLM_API_KEY");
/// ```
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    /// Create a new environment variable secret store
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn read_var(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::read_var(key) {
            return Some(value);
        }

        if let Some(env_vars) = ENV_VAR_MAP.get(key.to_lowercase().as_str()) {
            if let Some(value) = env_vars.iter().find_map(|var| Self::read_var(var)) {
                return Some(value);
            }
        }

        Self::read_var(&format!("{}_API_KEY", key.to_uppercase()))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_name() {
        assert_eq!(EnvSecretStore::new().name(), "env");
    }

    #[test]
    fn test_env_store_read_only() {
        let store = EnvSecretStore::new();
        assert!(matches!(store.store("test", "value"), Err(SecretStoreError::ReadOnly)));
        assert!(matches!(store.delete("test"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_get_direct() {
        env::set_var("TOOLBROKER_TEST_SECRET_12345", "test_value");

        let store = EnvSecretStore::new();
        assert_eq!(
            store.get("TOOLBROKER_TEST_SECRET_12345"),
            Some("test_value".to_string())
        );

        env::remove_var("TOOLBROKER_TEST_SECRET_12345");
    }

    #[test]
    fn test_env_store_suffix_lookup() {
        env::set_var("TOOLBROKER_SUFFIX_API_KEY", "sk-suffix");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("toolbroker_suffix"), Some("sk-suffix".to_string()));

        env::remove_var("TOOLBROKER_SUFFIX_API_KEY");
    }

    #[test]
    fn test_env_store_empty_value_is_absent() {
        env::set_var("TOOLBROKER_EMPTY_SECRET", "");

        let store = EnvSecretStore::new();
        assert!(!store.has("TOOLBROKER_EMPTY_SECRET"));

        env::remove_var("TOOLBROKER_EMPTY_SECRET");
    }

    #[test]
    fn test_env_store_get_not_found() {
        let store = EnvSecretStore::new();
        assert_eq!(store.get("nonexistent_provider_xyz"), None);
    }
}
