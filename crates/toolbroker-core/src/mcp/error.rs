//! MCP layer error types

use thiserror::Error;

/// Errors raised while launching, talking to, or routing between tool providers
#[derive(Error, Debug)]
pub enum McpError {
    /// The provider process could not be spawned
    #[error("failed to spawn provider '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    /// The process started but the protocol handshake failed
    #[error("provider '{name}' initialization failed: {reason}")]
    InitializationFailed { name: String, reason: String },

    /// A tool operation was attempted on a session that is not (or no longer) initialized
    #[error("provider '{name}' is not initialized")]
    NotInitialized { name: String },

    /// A provider with this name is already registered
    #[error("provider already exists: {0}")]
    DuplicateName(String),

    /// No provider with this name is registered
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// No active provider exposes this tool
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The provider reported a failure or became unreachable during a call
    #[error("tool '{tool}' failed: {reason}")]
    ToolCallFailed { tool: String, reason: String },

    /// The provider answered with something the client could not use
    #[error("protocol error from provider '{name}': {reason}")]
    Protocol { name: String, reason: String },
}

impl McpError {
    /// True for failures that happened while bringing a provider up
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            McpError::SpawnFailed { .. } | McpError::InitializationFailed { .. }
        )
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_provider() {
        let err = McpError::InitializationFailed {
            name: "calc".to_string(),
            reason: "connection closed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "provider 'calc' initialization failed: connection closed"
        );
        assert!(err.is_launch_failure());

        let err = McpError::ToolNotFound("add".to_string());
        assert_eq!(err.to_string(), "tool not found: add");
        assert!(!err.is_launch_failure());
    }
}
