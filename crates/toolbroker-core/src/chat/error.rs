//! Conversation error types

use thiserror::Error;

use crate::providers::ProviderError;

/// Hard failures of a chat turn
///
/// Tool failures never appear here; they become transcript content.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The LLM backend failed, including after the degraded retry
    #[error("LLM request failed: {0}")]
    Llm(#[from] ProviderError),
}

pub type ChatResult<T> = Result<T, ChatError>;
