//! File-based configuration (YAML)
//!
//! Default location is `~/.config/toolbroker/config.yaml` (platform config dir).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_MAX_SESSIONS;
use crate::mcp::{McpServerConfig, ProcessTimeouts};
use crate::providers::BackendModelConfig;

use super::error::{ConfigError, ConfigResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// LLM backend settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Provider process bounds
    #[serde(default)]
    pub timeouts: TimeoutSettings,

    /// Conversation retention
    #[serde(default)]
    pub sessions: SessionSettings,

    /// Providers launched at startup, in order
    #[serde(default)]
    pub providers: Vec<McpServerConfig>,
}

/// LLM backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model name passed to the backend
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Custom endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

fn default_model() -> String {
    "o4-mini".to_string()
}

fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_base: None,
        }
    }
}

impl LlmSettings {
    /// Backend model configuration using `api_key`
    pub fn model_config(&self, api_key: impl Into<String>) -> BackendModelConfig {
        let config = BackendModelConfig::new(&self.model).with_api_key(api_key);
        match &self.api_base {
            Some(base) => config.with_api_base(base),
            None => config,
        }
    }
}

/// Provider process bounds, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_init_secs")]
    pub init_secs: u64,
    #[serde(default = "default_shutdown_secs")]
    pub shutdown_secs: u64,
}

fn default_init_secs() -> u64 {
    30
}

fn default_shutdown_secs() -> u64 {
    5
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            init_secs: default_init_secs(),
            shutdown_secs: default_shutdown_secs(),
        }
    }
}

impl From<TimeoutSettings> for ProcessTimeouts {
    fn from(settings: TimeoutSettings) -> Self {
        ProcessTimeouts {
            init: Duration::from_secs(settings.init_secs),
            shutdown: Duration::from_secs(settings.shutdown_secs),
        }
    }
}

/// Conversation retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

/// File-based configuration provider
///
/// Reads and writes the broker configuration as YAML, caching the last
/// loaded copy.
///
/// # Example
///
/// ```no_run
/// use toolbroker_core::config::FileConfigProvider;
///
/// let provider = FileConfigProvider::user();
/// let config = provider.config().unwrap();
/// println!("model: {}", config.llm.model);
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a config provider for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider (~/.config/toolbroker/config.yaml)
    pub fn user() -> Self {
        Self::new(Self::default_path())
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("toolbroker").join("config.yaml")
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load config from file
    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save config to file
    pub fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))?;

        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());

        Ok(())
    }

    /// Get cached or load config
    pub fn config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }

        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}
