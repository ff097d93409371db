//! Core types shared by the orchestrator and the LLM backends
//!
//! This module contains the transcript and function-calling types.

mod message;
mod tool;
mod completion;

pub use message::{ChatMessage, MessageRole};
pub use tool::{Tool, ToolCall, ToolChoice};
pub use completion::Completion;
