//! Provider session using the official rmcp SDK
//!
//! Performs the MCP handshake over a [`ProcessTransport`]'s pipes and exposes
//! tool listing and invocation. Calls on one session are serialized; the
//! protocol is treated as a single ordered request/response channel.
//!
//! Teardown never waits behind a request: requests run on a cloned peer
//! handle, so `close` can cancel the service and stop the process while a
//! call is still outstanding.

use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, RawContent, Tool},
    service::{Peer, RunningService},
    RoleClient,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::logging::Logger;

use super::error::{McpError, McpResult};
use super::transport::ProcessTransport;

/// Result of one tool invocation, tagged at the protocol boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The provider's raw structured result
    Success { payload: Value },
    /// The provider flagged the call as failed
    Error { message: String },
}

impl ToolOutcome {
    /// Build an outcome from the provider's response
    pub fn from_call_result(result: &CallToolResult) -> Result<Self, serde_json::Error> {
        if result.is_error.unwrap_or(false) {
            let message = result
                .content
                .iter()
                .filter_map(|c| match &c.raw {
                    RawContent::Text(t) => Some(t.text.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            let message = if message.is_empty() {
                "provider reported an error".to_string()
            } else {
                message
            };
            return Ok(ToolOutcome::Error { message });
        }

        Ok(ToolOutcome::Success {
            payload: serde_json::to_value(result)?,
        })
    }

    /// Collapse into a payload, turning a reported failure into `ToolCallFailed`
    pub fn into_payload(self, tool: &str) -> McpResult<Value> {
        match self {
            ToolOutcome::Success { payload } => Ok(payload),
            ToolOutcome::Error { message } => Err(McpError::ToolCallFailed {
                tool: tool.to_string(),
                reason: message,
            }),
        }
    }
}

struct SessionState {
    service: Option<RunningService<RoleClient, ClientInfo>>,
    transport: Option<ProcessTransport>,
}

/// An initialized MCP session with one provider process
pub struct McpClient {
    name: String,
    /// Held only briefly, never across a request
    state: Mutex<SessionState>,
    /// Held for a whole request
    requests: Mutex<()>,
    shutdown_timeout: Duration,
    logger: Arc<dyn Logger>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolbroker-core".to_string(),
            title: Some("Toolbroker".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpClient {
    /// Run the handshake on a freshly started transport
    ///
    /// On any failure the transport is stopped before the error is returned,
    /// so a failed handshake never leaves a process behind.
    pub async fn initialize(
        mut transport: ProcessTransport,
        init_timeout: Duration,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        let name = transport.name().to_string();

        let Some(stdio) = transport.take_stdio() else {
            transport.stop().await;
            return Err(McpError::InitializationFailed {
                name,
                reason: "provider stdio is not available".to_string(),
            });
        };

        logger.info(&format!("[McpClient] Initializing '{}'", name));

        let reason = match tokio::time::timeout(init_timeout, client_info().serve(stdio)).await {
            Ok(Ok(service)) => {
                logger.info(&format!(
                    "[McpClient] '{}' connected and initialized successfully",
                    name
                ));
                return Ok(Self {
                    name,
                    shutdown_timeout: transport.shutdown_timeout(),
                    state: Mutex::new(SessionState {
                        service: Some(service),
                        transport: Some(transport),
                    }),
                    requests: Mutex::new(()),
                    logger,
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("handshake timed out after {:?}", init_timeout),
        };

        let stderr = transport.stderr_tail();
        transport.stop().await;

        let reason = if stderr.is_empty() {
            reason
        } else {
            format!("{reason} | stderr: {stderr}")
        };
        logger.error(&format!("[McpClient] '{}' initialization failed: {}", name, reason));

        Err(McpError::InitializationFailed { name, reason })
    }

    /// Provider name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process id of the provider, `None` once closed
    pub async fn pid(&self) -> Option<u32> {
        self.state.lock().await.transport.as_ref().and_then(ProcessTransport::pid)
    }

    fn peer(&self, state: &SessionState) -> McpResult<Peer<RoleClient>> {
        state
            .service
            .as_ref()
            .map(|service| service.peer().clone())
            .ok_or_else(|| McpError::NotInitialized {
                name: self.name.clone(),
            })
    }

    /// List the tools the provider currently exposes
    ///
    /// Always queries the live provider.
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let _turn = self.requests.lock().await;
        let peer = self.peer(&*self.state.lock().await)?;

        let result = peer
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol {
                name: self.name.clone(),
                reason: e.to_string(),
            })?;

        self.logger.debug(&format!(
            "[McpClient] '{}' listed {} tools",
            self.name,
            result.tools.len()
        ));

        Ok(result.tools)
    }

    /// Call a tool by name, forwarding the arguments verbatim
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        let _turn = self.requests.lock().await;
        let peer = self.peer(&*self.state.lock().await)?;

        self.logger.info(&format!("[McpClient] '{}' calling tool: {}", self.name, name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = peer
            .call_tool(params)
            .await
            .map_err(|e| McpError::ToolCallFailed {
                tool: name.to_string(),
                reason: e.to_string(),
            })?;

        ToolOutcome::from_call_result(&result).map_err(|e| McpError::Protocol {
            name: self.name.clone(),
            reason: format!("unserializable result from '{}': {}", name, e),
        })
    }

    /// Close the session and stop the process
    ///
    /// Idempotent; later calls are no-ops and tool operations fail with
    /// `NotInitialized`. Does not wait for an outstanding request: that
    /// request fails once the service is cancelled. Bounded by the transport's
    /// shutdown timeout for the service and again for the process.
    pub async fn close(&self) {
        let (service, transport) = {
            let mut state = self.state.lock().await;
            (state.service.take(), state.transport.take())
        };

        if let Some(service) = service {
            self.logger.info(&format!("[McpClient] Closing '{}'", self.name));
            match tokio::time::timeout(self.shutdown_timeout, service.cancel()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => self.logger.warn(&format!(
                    "[McpClient] '{}' service did not shut down cleanly: {}",
                    self.name, e
                )),
                Err(_) => self.logger.warn(&format!(
                    "[McpClient] '{}' service did not stop within {:?}",
                    self.name, self.shutdown_timeout
                )),
            }
        }

        if let Some(transport) = transport {
            transport.stop().await;
        }
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient").field("name", &self.name).finish()
    }
}
