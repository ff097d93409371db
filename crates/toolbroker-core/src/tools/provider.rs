//! Provider seams
//!
//! `ToolProvider` is a running provider as the registry sees it;
//! `ProviderLauncher` knows how to bring one up from its config. The stdio
//! implementations wrap [`McpClient`] and [`ProcessTransport`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::logging::Logger;
use crate::mcp::{McpClient, McpResult, McpServerConfig, ProcessTimeouts, ProcessTransport, ToolOutcome};

use super::catalog::ToolInfo;

/// A running tool provider
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Current tools, queried live
    async fn list_tools(&self) -> McpResult<Vec<ToolInfo>>;

    /// Invoke a tool and return the provider's tagged outcome
    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome>;

    /// Release the provider; idempotent and infallible
    async fn close(&self);
}

/// Starts providers from their configuration
///
/// Implementations must tear down anything they started before returning an
/// error, so a failed launch never leaks a process.
#[async_trait]
pub trait ProviderLauncher: Send + Sync {
    async fn launch(&self, config: &McpServerConfig) -> McpResult<Arc<dyn ToolProvider>>;
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        McpClient::name(self)
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolInfo>> {
        let tools = McpClient::list_tools(self).await?;
        Ok(tools
            .into_iter()
            .map(|tool| ToolInfo::from_mcp(McpClient::name(self), tool))
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&self) {
        McpClient::close(self).await
    }
}

/// Launches providers as child processes speaking MCP over stdio
pub struct StdioLauncher {
    timeouts: ProcessTimeouts,
    logger: Arc<dyn Logger>,
}

impl StdioLauncher {
    /// Create a launcher with the given startup/teardown bounds
    pub fn new(timeouts: ProcessTimeouts, logger: Arc<dyn Logger>) -> Self {
        Self { timeouts, logger }
    }
}

#[async_trait]
impl ProviderLauncher for StdioLauncher {
    async fn launch(&self, config: &McpServerConfig) -> McpResult<Arc<dyn ToolProvider>> {
        let transport = ProcessTransport::start(config, self.timeouts.shutdown, Arc::clone(&self.logger))?;
        let client = McpClient::initialize(transport, self.timeouts.init, Arc::clone(&self.logger)).await?;
        Ok(Arc::new(client))
    }
}
