//! Launch configuration for a tool-provider process

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to start one tool provider
///
/// Immutable once the provider is running; the registry keys providers by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Unique provider name
    pub name: String,
    /// Executable, resolved against `PATH` at launch
    pub command: String,
    /// Command-line arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides layered over the parent environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl McpServerConfig {
    /// Create a config with no arguments or overrides
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Set the argument list
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment override
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Bounds applied to provider startup and teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTimeouts {
    /// Maximum time for the initialize handshake
    pub init: Duration,
    /// Maximum wait for the child to exit before it is killed
    pub shutdown: Duration,
}

impl Default for ProcessTimeouts {
    fn default() -> Self {
        Self {
            init: Duration::from_secs(30),
            shutdown: Duration::from_secs(5),
        }
    }
}
