//! Broker facade
//!
//! `ToolBroker` is what a front end (CLI, HTTP layer) talks to. It owns the
//! provider registry and the chat orchestrator and exposes the five boundary
//! operations: add/remove/list providers, list tools, and chat.

use std::sync::Arc;

use thiserror::Error;

use crate::chat::{ChatError, ChatOrchestrator, ChatReply, SessionStore};
use crate::config::ConfigFile;
use crate::logging::Logger;
use crate::mcp::{McpError, McpServerConfig};
use crate::providers::{ChatBackend, GenaiBackend};
use crate::tools::{ProviderRegistry, ToolInfo};

/// Errors surfaced at the broker boundary
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// Coarse classification for callers mapping errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    Duplicate,
    LaunchFailed,
    NotFound,
    InvocationFailed,
    LlmUnavailable,
}

impl BrokerError {
    /// Classify the error
    pub fn kind(&self) -> BrokerErrorKind {
        match self {
            BrokerError::Mcp(McpError::DuplicateName(_)) => BrokerErrorKind::Duplicate,
            BrokerError::Mcp(McpError::ProviderNotFound(_) | McpError::ToolNotFound(_)) => {
                BrokerErrorKind::NotFound
            }
            BrokerError::Mcp(e) if e.is_launch_failure() => BrokerErrorKind::LaunchFailed,
            BrokerError::Mcp(_) => BrokerErrorKind::InvocationFailed,
            BrokerError::Chat(_) => BrokerErrorKind::LlmUnavailable,
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Entry point tying providers, sessions and the LLM backend together
pub struct ToolBroker {
    registry: Arc<ProviderRegistry>,
    orchestrator: ChatOrchestrator,
    logger: Arc<dyn Logger>,
}

impl ToolBroker {
    /// Assemble a broker from its parts
    pub fn new(
        registry: Arc<ProviderRegistry>,
        backend: Arc<dyn ChatBackend>,
        sessions: SessionStore,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let orchestrator = ChatOrchestrator::new(
            Arc::clone(&registry),
            backend,
            sessions,
            Arc::clone(&logger),
        );
        Self {
            registry,
            orchestrator,
            logger,
        }
    }

    /// Build a broker that launches stdio providers and talks to a genai backend
    ///
    /// Configured providers are not started; see [`ToolBroker::start_providers`].
    pub fn from_config(config: &ConfigFile, api_key: &str, logger: Arc<dyn Logger>) -> Self {
        let registry = Arc::new(ProviderRegistry::stdio(
            config.timeouts.into(),
            Arc::clone(&logger),
        ));
        let backend = Arc::new(GenaiBackend::new(
            config.llm.model_config(api_key),
            Arc::clone(&logger),
        ));
        let sessions = SessionStore::new(config.sessions.max_sessions, Arc::clone(&logger));
        Self::new(registry, backend, sessions, logger)
    }

    /// Start a provider under `config.name`
    pub async fn add_provider(&self, config: McpServerConfig) -> BrokerResult<()> {
        Ok(self.registry.add(config).await?)
    }

    /// Stop and forget a provider
    pub async fn remove_provider(&self, name: &str) -> BrokerResult<()> {
        Ok(self.registry.remove(name).await?)
    }

    /// Names of active providers, in registration order
    pub fn list_providers(&self) -> Vec<String> {
        self.registry.list_names()
    }

    /// Tools of one provider, or of all providers when `provider` is `None`
    pub async fn list_tools(&self, provider: Option<&str>) -> BrokerResult<Vec<ToolInfo>> {
        Ok(self.registry.list_tools(provider).await?)
    }

    /// Run one chat turn
    pub async fn chat(&self, session_id: Option<&str>, message: &str) -> BrokerResult<ChatReply> {
        Ok(self.orchestrator.chat(session_id, message).await?)
    }

    /// Forget a conversation; returns whether it existed
    pub fn end_session(&self, session_id: &str) -> bool {
        self.orchestrator.sessions().end_session(session_id)
    }

    /// Start each provider in order, continuing past failures
    ///
    /// Returns the failures, which are also logged.
    pub async fn start_providers(&self, configs: &[McpServerConfig]) -> Vec<(String, BrokerError)> {
        let mut failures = Vec::new();

        for config in configs {
            let name = config.name.clone();
            if let Err(e) = self.add_provider(config.clone()).await {
                self.logger.error(&format!(
                    "[ToolBroker] Configured provider '{}' did not start: {}",
                    name, e
                ));
                failures.push((name, e));
            }
        }

        failures
    }

    /// Stop every provider
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
        self.logger.info("[ToolBroker] Shut down");
    }

    /// Underlying registry
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }
}
