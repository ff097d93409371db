//! Secret lookup
//!
//! The broker needs exactly one credential (the LLM API key), read once at
//! startup. `SecretStore` keeps where it comes from pluggable:
//! - `EnvSecretStore` reads the process environment
//! - `MemorySecretStore` backs tests and embedders that already hold the key

mod traits;
mod env_store;
mod memory_store;

pub use traits::{require_secret, SecretStore, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
