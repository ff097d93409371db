//! Broker configuration
//!
//! A single YAML file (`<config_dir>/toolbroker/config.yaml` by default)
//! holds the LLM settings, process timeouts, session retention and the
//! providers to launch at startup. A missing file yields defaults.

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, FileConfigProvider, LlmSettings, SessionSettings, TimeoutSettings};
