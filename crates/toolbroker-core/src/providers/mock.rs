//! Mock backend for testing
//!
//! Provides deterministic, scripted completions without network dependencies.
//! Every request is recorded so tests can inspect the transcript and the
//! function schemas that were sent.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatBackend, CompletionOptions};
use crate::logging::Logger;
use crate::types::{ChatMessage, Completion, MessageRole, Tool, ToolCall};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with fixed text
    Text(String),
    /// Select a tool
    ToolCall { name: String, arguments: Value },
    /// Reject the request's function schema set
    SchemaRejection(String),
    /// Fail with a generic upstream error
    Failure(String),
    /// Answer with the content of the latest function-result message
    EchoFunctionResult,
}

impl MockReply {
    /// Scripted text reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Scripted tool selection
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        MockReply::ToolCall {
            name: name.into(),
            arguments,
        }
    }
}

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Transcript sent
    pub messages: Vec<ChatMessage>,
    /// Function schemas offered, `None` in plain-chat mode
    pub tools: Option<Vec<Tool>>,
}

/// Scripted chat backend
///
/// Replies are consumed in order; once the script runs out the backend
/// echoes the last user message.
pub struct MockBackend {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Arc<dyn Logger>,
}

impl MockBackend {
    /// Create a backend with an empty script (echo mode)
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self::scripted(Vec::new(), logger)
    }

    /// Create a backend that answers with `replies` in order
    pub fn scripted(replies: Vec<MockReply>, logger: Arc<dyn Logger>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Append a reply to the script
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_content(messages: &[ChatMessage], role: MessageRole) -> Option<&str> {
        messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> ProviderResult<Completion> {
        let request_index = {
            let mut requests = self.requests.lock();
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tools: options.offered_tools().map(|t| t.to_vec()),
            });
            requests.len()
        };

        let reply = self.replies.lock().pop_front();
        self.logger.debug(&format!(
            "[MockBackend] Request {}: {:?}",
            request_index, reply
        ));

        match reply {
            Some(MockReply::Text(text)) => Ok(Completion::text(text)),
            Some(MockReply::ToolCall { name, arguments }) => Ok(Completion::tool_call(
                ToolCall::new(format!("call_{}", request_index), name, arguments),
            )),
            Some(MockReply::SchemaRejection(message)) => {
                Err(ProviderError::invalid_tool_schema("mock", message))
            }
            Some(MockReply::Failure(message)) => Err(ProviderError::api_error("mock", 503, message)),
            Some(MockReply::EchoFunctionResult) => {
                let result = Self::last_content(messages, MessageRole::Function).unwrap_or("");
                Ok(Completion::text(format!("The result is {}", result)))
            }
            None => {
                let user_msg = Self::last_content(messages, MessageRole::User)
                    .unwrap_or("Hello from MockBackend!");
                Ok(Completion::text(format!("Echo: {}", user_msg)))
            }
        }
    }
}
