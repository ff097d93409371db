//! Completion result returned by an LLM backend

use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

/// Outcome of one completion request
///
/// The model either answers in natural language or asks for exactly one
/// tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Completion {
    /// Natural-language reply
    Text { text: String },
    /// Requested tool invocation
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
}

impl Completion {
    /// Create a text completion
    pub fn text(text: impl Into<String>) -> Self {
        Completion::Text { text: text.into() }
    }

    /// Create a tool call completion
    pub fn tool_call(tool_call: ToolCall) -> Self {
        Completion::ToolCall { tool_call }
    }

    /// Get the text if this is a text completion
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Completion::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Get the tool call if the model selected a tool
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Completion::ToolCall { tool_call } => Some(tool_call),
            _ => None,
        }
    }
}
