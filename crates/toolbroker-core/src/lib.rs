//! Toolbroker Core
//!
//! Brokers conversations between an LLM and a dynamic set of tool-provider
//! subprocesses speaking MCP over stdio.
//!
//! ## Layers
//!
//! - `mcp`: spawn a provider process, handshake, list and call its tools
//! - `tools`: registry of named providers and the aggregated tool catalog
//! - `chat`: per-session transcripts and the tool-calling conversation loop
//! - `providers`: the LLM backend (`genai`, or a scripted mock)
//! - `broker`: the facade front ends talk to
//!
//! ```rust,ignore
//! use toolbroker_core::{ToolBroker, McpServerConfig, config::FileConfigProvider};
//!
//! let config = FileConfigProvider::user().config()?;
//! let broker = ToolBroker::from_config(&config, &api_key, logger);
//!
//! broker.add_provider(McpServerConfig::new("calc", "npx").with_args(["-y", "calc-mcp"])).await?;
//! let reply = broker.chat(None, "what is 2+2").await?;
//! println!("{} (tool: {:?})", reply.response, reply.tool_name);
//!
//! broker.shutdown().await;
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod providers;
pub mod mcp;
pub mod tools;
pub mod chat;
pub mod broker;

// Re-export commonly used types
pub use types::{ChatMessage, Completion, MessageRole, Tool, ToolCall, ToolChoice};

pub use secrets::{
    require_secret, EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError,
    SecretStoreResult,
};

pub use logging::{Logger, NoOpLogger, TracingLogger};

pub use config::{ConfigError, ConfigFile, FileConfigProvider};

pub use providers::{BackendModelConfig, ChatBackend, GenaiBackend, ProviderError};

pub use mcp::{McpClient, McpError, McpResult, McpServerConfig, ProcessTimeouts, ToolOutcome};

pub use tools::{ProviderLauncher, ProviderRegistry, StdioLauncher, ToolInfo, ToolProvider};

pub use chat::{ChatError, ChatOrchestrator, ChatReply, SessionStore};

pub use broker::{BrokerError, BrokerErrorKind, BrokerResult, ToolBroker};
