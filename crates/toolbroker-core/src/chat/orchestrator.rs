//! Conversation orchestrator
//!
//! One `chat` call moves a session from Fresh/Active through an optional
//! tool round trip and back to Active:
//!
//! 1. Refresh the system instructions from the current catalog
//! 2. Append the user message
//! 3. Ask the backend with the sanitized function schemas (one degraded retry
//!    without schemas if the backend rejects them)
//! 4. If a tool was selected, invoke it and ask again for the follow-up
//! 5. Append the assistant reply
//!
//! The turn works on a copy of the transcript and commits it only when the
//! turn completes, so a hard failure leaves the session unchanged.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::logging::Logger;
use crate::providers::{ChatBackend, CompletionOptions};
use crate::tools::ProviderRegistry;
use crate::types::{ChatMessage, Completion, Tool, ToolCall, ToolChoice};

use super::error::ChatResult;
use super::instructions::{apply_instructions, render_instructions};
use super::schema::function_schemas;
use super::session::{new_session_id, SessionStore};

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    /// Session the turn belonged to (generated when none was given)
    pub session_id: String,
    /// Assistant reply appended to the transcript
    pub response: String,
    /// Tool the model selected, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Arguments the tool was called with, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_arguments: Option<Value>,
}

/// Drives conversations against the backend and the provider registry
pub struct ChatOrchestrator {
    registry: Arc<ProviderRegistry>,
    backend: Arc<dyn ChatBackend>,
    sessions: SessionStore,
    logger: Arc<dyn Logger>,
}

impl ChatOrchestrator {
    /// Create an orchestrator
    pub fn new(
        registry: Arc<ProviderRegistry>,
        backend: Arc<dyn ChatBackend>,
        sessions: SessionStore,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            backend,
            sessions,
            logger,
        }
    }

    /// Session store backing this orchestrator
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Run one turn of the conversation identified by `session_id`
    ///
    /// Fails only when the backend cannot produce the first reply. Tool
    /// failures are reported inside `response`.
    pub async fn chat(&self, session_id: Option<&str>, message: &str) -> ChatResult<ChatReply> {
        let session_id = session_id.map(str::to_string).unwrap_or_else(new_session_id);
        let shared = self.sessions.checkout(&session_id);
        let mut transcript = shared.lock().await;

        let mut working = transcript.clone();
        let catalog = self.registry.catalog().await;
        apply_instructions(&mut working, render_instructions(&catalog));
        working.push(ChatMessage::user(message));

        let schemas = function_schemas(&catalog, self.logger.as_ref());
        let completion = self.complete_with_fallback(&working, schemas).await?;

        let reply = match completion {
            Completion::Text { text } => ChatReply {
                session_id,
                response: text,
                tool_name: None,
                tool_arguments: None,
            },
            Completion::ToolCall { tool_call } => {
                let (response, arguments) = self.run_tool(&mut working, &tool_call).await;
                ChatReply {
                    session_id,
                    response,
                    tool_name: Some(tool_call.name),
                    tool_arguments: Some(arguments),
                }
            }
        };

        working.push(ChatMessage::assistant(reply.response.clone()));
        *transcript = working;

        Ok(reply)
    }

    /// First completion of a turn, retried once without schemas on rejection
    async fn complete_with_fallback(
        &self,
        messages: &[ChatMessage],
        schemas: Vec<Tool>,
    ) -> ChatResult<Completion> {
        let mut tools = if schemas.is_empty() { None } else { Some(schemas) };

        loop {
            let options = CompletionOptions {
                tools: tools.clone(),
                tool_choice: Some(ToolChoice::Auto),
            };

            match self.backend.complete(messages, options).await {
                Err(e) if e.is_schema_rejection() && tools.is_some() => {
                    self.logger.warn(&format!(
                        "[ChatOrchestrator] Backend rejected tool schemas, retrying without tools: {}",
                        e
                    ));
                    tools = None;
                }
                result => return Ok(result?),
            }
        }
    }

    /// Execute a requested tool and produce the assistant reply
    ///
    /// Returns the reply text and the arguments the tool was called with.
    async fn run_tool(&self, transcript: &mut Vec<ChatMessage>, call: &ToolCall) -> (String, Value) {
        let arguments = match normalize_arguments(&call.input) {
            Ok(arguments) => arguments,
            Err(reason) => {
                self.logger.warn(&format!(
                    "[ChatOrchestrator] Unusable arguments for '{}': {}",
                    call.name, reason
                ));
                return (tool_error(&call.name, reason), call.input.clone());
            }
        };

        self.logger.info(&format!("[ChatOrchestrator] Invoking tool '{}'", call.name));

        let result = match self
            .registry
            .resolve_and_invoke(&call.name, arguments.clone())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                self.logger.warn(&format!(
                    "[ChatOrchestrator] Tool '{}' failed: {}",
                    call.name, e
                ));
                return (tool_error(&call.name, e), arguments);
            }
        };

        transcript.push(ChatMessage::function_result(&call.name, result.to_string()));

        let response = match self.backend.complete(transcript, CompletionOptions::new()).await {
            Ok(Completion::Text { text }) => text,
            Ok(Completion::ToolCall { tool_call }) => {
                self.logger.warn(&format!(
                    "[ChatOrchestrator] Ignoring tool call '{}' in follow-up reply",
                    tool_call.name
                ));
                String::new()
            }
            Err(e) => {
                self.logger.error(&format!(
                    "[ChatOrchestrator] Follow-up after '{}' failed: {}",
                    call.name, e
                ));
                tool_error(&call.name, e)
            }
        };

        (response, arguments)
    }
}

fn tool_error(tool: &str, reason: impl std::fmt::Display) -> String {
    format!("Error calling tool {}: {}", tool, reason)
}

/// Coerce model-produced arguments into a JSON object
///
/// Some backends deliver arguments as an encoded string; those are decoded.
/// Missing arguments become `{}`.
fn normalize_arguments(input: &Value) -> Result<Value, String> {
    match input {
        Value::Object(_) => Ok(input.clone()),
        Value::Null => Ok(Value::Object(Map::new())),
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(decoded @ Value::Object(_)) => Ok(decoded),
            Ok(_) => Err("arguments must be a JSON object".to_string()),
            Err(e) => Err(format!("invalid JSON arguments: {}", e)),
        },
        _ => Err("arguments must be a JSON object".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatError;
    use crate::chat::schema::empty_object_schema;
    use crate::logging::NoOpLogger;
    use crate::mcp::McpServerConfig;
    use crate::providers::{MockBackend, MockReply};
    use crate::tools::{MockLauncher, MockToolProvider};
    use crate::types::MessageRole;
    use serde_json::json;

    fn add_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        })
    }

    fn calc() -> MockToolProvider {
        MockToolProvider::new("calc")
            .with_tool("add", "Add two numbers", add_schema())
            .with_result("add", json!(4))
    }

    struct Harness {
        orchestrator: ChatOrchestrator,
        registry: Arc<ProviderRegistry>,
        launcher: Arc<MockLauncher>,
        backend: Arc<MockBackend>,
    }

    async fn harness(launcher: MockLauncher, providers: &[&str], replies: Vec<MockReply>) -> Harness {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
        let launcher = Arc::new(launcher);
        let registry = Arc::new(ProviderRegistry::new(launcher.clone(), Arc::clone(&logger)));
        for name in providers {
            registry
                .add(McpServerConfig::new(*name, "unused"))
                .await
                .unwrap();
        }
        let backend = Arc::new(MockBackend::scripted(replies, Arc::clone(&logger)));
        let orchestrator = ChatOrchestrator::new(
            Arc::clone(&registry),
            backend.clone(),
            SessionStore::new(100, Arc::clone(&logger)),
            logger,
        );
        Harness {
            orchestrator,
            registry,
            launcher,
            backend,
        }
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let h = harness(MockLauncher::new(), &[], vec![MockReply::text("Hi!")]).await;

        let reply = h.orchestrator.chat(Some("s1"), "hello").await.unwrap();
        assert_eq!(reply.session_id, "s1");
        assert_eq!(reply.response, "Hi!");
        assert!(reply.tool_name.is_none());
        assert!(reply.tool_arguments.is_none());

        let transcript = h.orchestrator.sessions().transcript("s1").await.unwrap();
        let roles: Vec<_> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        // Empty catalog means plain chat
        assert!(h.backend.requests()[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_missing_session_id_generates_one() {
        let h = harness(MockLauncher::new(), &[], vec![]).await;

        let first = h.orchestrator.chat(None, "one").await.unwrap();
        let second = h.orchestrator.chat(None, "two").await.unwrap();
        assert!(!first.session_id.is_empty());
        assert_ne!(first.session_id, second.session_id);
        assert_eq!(first.response, "Echo: one");
    }

    #[tokio::test]
    async fn test_calc_scenario() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![
                MockReply::tool_call("add", json!({"a": 2, "b": 2})),
                MockReply::EchoFunctionResult,
            ],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "what is 2+2").await.unwrap();
        assert!(reply.response.contains('4'));
        assert_eq!(reply.tool_name.as_deref(), Some("add"));
        assert_eq!(reply.tool_arguments, Some(json!({"a": 2, "b": 2})));

        let calls = h.launcher.provider("calc").unwrap().calls();
        assert_eq!(calls, vec![("add".to_string(), json!({"a": 2, "b": 2}))]);

        let requests = h.backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.as_ref().map(|t| t.len()), Some(1));
        // Follow-up is plain chat over the transcript including the result
        assert!(requests[1].tools.is_none());
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Function);
        assert_eq!(last.name.as_deref(), Some("add"));
        assert_eq!(last.content, "4");

        let transcript = h.orchestrator.sessions().transcript("s1").await.unwrap();
        let roles: Vec<_> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Function,
                MessageRole::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_reply() {
        let h = harness(
            MockLauncher::new().with_provider(
                MockToolProvider::new("calc")
                    .with_tool("divide", "Divide", add_schema())
                    .with_failing_tool("divide"),
            ),
            &["calc"],
            vec![MockReply::tool_call("divide", json!({"a": 1, "b": 0}))],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "1/0").await.unwrap();
        assert!(reply.response.starts_with("Error calling tool divide:"));
        assert!(reply.response.contains("mock failure in divide"));
        assert_eq!(reply.tool_name.as_deref(), Some("divide"));
        // No follow-up call after a failed invocation
        assert_eq!(h.backend.request_count(), 1);

        let transcript = h.orchestrator.sessions().transcript("s1").await.unwrap();
        assert_eq!(transcript.last().unwrap().content, reply.response);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_reply() {
        let h = harness(
            MockLauncher::new(),
            &[],
            vec![MockReply::tool_call("add", json!({}))],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap();
        assert_eq!(reply.response, "Error calling tool add: tool not found: add");
    }

    #[tokio::test]
    async fn test_encoded_arguments_are_decoded() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![
                MockReply::tool_call("add", json!("{\"a\": 2, \"b\": 2}")),
                MockReply::text("4"),
            ],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap();
        assert_eq!(reply.tool_arguments, Some(json!({"a": 2, "b": 2})));
        let calls = h.launcher.provider("calc").unwrap().calls();
        assert_eq!(calls[0].1, json!({"a": 2, "b": 2}));
    }

    #[tokio::test]
    async fn test_unparseable_arguments_are_a_soft_failure() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![MockReply::tool_call("add", json!("{not json"))],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap();
        assert!(reply.response.starts_with("Error calling tool add: invalid JSON arguments"));
        assert!(h.launcher.provider("calc").unwrap().calls().is_empty());
        assert_eq!(h.backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_failure_is_soft() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![
                MockReply::tool_call("add", json!({"a": 2, "b": 2})),
                MockReply::Failure("backend down".into()),
            ],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap();
        assert!(reply.response.starts_with("Error calling tool add:"));
        assert!(reply.response.contains("backend down"));
    }

    #[tokio::test]
    async fn test_schema_rejection_retries_without_tools() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![
                MockReply::SchemaRejection("invalid_function_parameters".into()),
                MockReply::text("plain answer"),
            ],
        )
        .await;

        let reply = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap();
        assert_eq!(reply.response, "plain answer");
        assert!(reply.tool_name.is_none());

        let requests = h.backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].tools.is_some());
        assert!(requests[1].tools.is_none());
    }

    #[tokio::test]
    async fn test_degraded_retry_failure_is_hard() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![
                MockReply::SchemaRejection("invalid schema".into()),
                MockReply::Failure("down".into()),
            ],
        )
        .await;

        let err = h.orchestrator.chat(Some("s1"), "2+2").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
        assert_eq!(h.backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let h = harness(
            MockLauncher::new().with_provider(calc()),
            &["calc"],
            vec![MockReply::text("first"), MockReply::Failure("down".into())],
        )
        .await;

        h.orchestrator.chat(Some("s1"), "hello").await.unwrap();
        let before = h.orchestrator.sessions().transcript("s1").await.unwrap();

        let err = h.orchestrator.chat(Some("s1"), "again").await.unwrap_err();
        assert!(matches!(err, ChatError::Llm(_)));
        assert_eq!(h.backend.request_count(), 2);

        // Hard failure leaves the transcript as it was
        let after = h.orchestrator.sessions().transcript("s1").await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_malformed_schema_is_never_sent() {
        let h = harness(
            MockLauncher::new().with_provider(
                MockToolProvider::new("odd").with_tool("broken", "", json!({"type": "object"})),
            ),
            &["odd"],
            vec![MockReply::text("ok")],
        )
        .await;

        h.orchestrator.chat(Some("s1"), "hi").await.unwrap();
        let tools = h.backend.requests()[0].tools.clone().unwrap();
        assert_eq!(tools[0].input_schema, Some(empty_object_schema()));
    }

    #[tokio::test]
    async fn test_instructions_follow_current_providers() {
        let h = harness(
            MockLauncher::new()
                .with_provider(calc())
                .with_provider(MockToolProvider::new("clock").with_tool("now", "Current time", json!({}))),
            &["calc"],
            vec![MockReply::text("one"), MockReply::text("two")],
        )
        .await;

        h.orchestrator.chat(Some("s1"), "first").await.unwrap();
        h.registry.remove("calc").await.unwrap();
        h.registry
            .add(McpServerConfig::new("clock", "unused"))
            .await
            .unwrap();
        h.orchestrator.chat(Some("s1"), "second").await.unwrap();

        let transcript = h.orchestrator.sessions().transcript("s1").await.unwrap();
        let systems: Vec<_> = transcript
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .collect();
        assert_eq!(systems.len(), 1);
        assert_eq!(transcript[0].role, MessageRole::System);
        assert!(transcript[0].content.contains("now: Current time"));
        assert!(!transcript[0].content.contains("add: Add two numbers"));
        assert_eq!(transcript.len(), 5);
    }

    #[tokio::test]
    async fn test_same_session_turns_are_serialized() {
        let h = harness(MockLauncher::new(), &[], vec![]).await;
        let orchestrator = Arc::new(h.orchestrator);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator
                        .chat(Some("shared"), &format!("message {}", i))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let transcript = orchestrator.sessions().transcript("shared").await.unwrap();
        assert_eq!(transcript.len(), 9);
        // Every user message is directly answered by its echo
        for pair in transcript[1..].chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            assert_eq!(pair[1].content, format!("Echo: {}", pair[0].content));
        }
    }

    #[test]
    fn test_normalize_arguments() {
        assert_eq!(normalize_arguments(&json!({"a": 1})), Ok(json!({"a": 1})));
        assert_eq!(normalize_arguments(&Value::Null), Ok(json!({})));
        assert_eq!(normalize_arguments(&json!("")), Ok(json!({})));
        assert_eq!(normalize_arguments(&json!("{\"a\":1}")), Ok(json!({"a": 1})));
        assert!(normalize_arguments(&json!("[1,2]")).is_err());
        assert!(normalize_arguments(&json!(42)).is_err());
    }
}
