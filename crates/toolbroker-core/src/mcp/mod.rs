//! MCP (Model Context Protocol) provider plumbing
//!
//! Tool providers are child processes speaking MCP over stdin/stdout.
//! - `transport`: spawn/stop the process, npx cache isolation
//! - `client`: handshake, tool listing and invocation via the rmcp SDK
//!
//! # Example
//!
//! ```rust,ignore
//! use toolbroker_core::mcp::{McpClient, McpServerConfig, ProcessTransport, ProcessTimeouts};
//!
//! let config = McpServerConfig::new("fs", "npx")
//!     .with_args(["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]);
//! let timeouts = ProcessTimeouts::default();
//!
//! let transport = ProcessTransport::start(&config, timeouts.shutdown, logger.clone())?;
//! let client = McpClient::initialize(transport, timeouts.init, logger).await?;
//!
//! let tools = client.list_tools().await?;
//! let outcome = client.call_tool("read_file", json!({ "path": "/tmp/a.txt" })).await?;
//!
//! client.close().await;
//! ```

mod client;
mod config;
mod error;
mod transport;

pub use client::{McpClient, ToolOutcome};
pub use config::{McpServerConfig, ProcessTimeouts};
pub use error::{McpError, McpResult};
pub use transport::{is_package_runner, resolve_command, LaunchPlan, ProcessTransport, NPX_CACHE_PREFIX};

// Re-export rmcp types that consumers might need
pub use rmcp::model::{Tool as McpTool, CallToolResult as McpToolResult};
