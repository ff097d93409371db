//! Adapter between toolbroker types and genai types
//!
//! Conversion functions between our transcript/tool types and genai's, plus
//! client construction. Auth uses the key from the broker configuration and
//! falls back to our `EnvSecretStore`, not genai's own env var lookup.

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest, ChatRole as GenaiRole,
    MessageContent as GenaiContent, Tool as GenaiTool, ToolCall as GenaiToolCall,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::secrets::{EnvSecretStore, SecretStore};
use crate::types::{ChatMessage, MessageRole, Tool, ToolCall, ToolChoice};

use super::error::ProviderError;
use super::traits::{BackendModelConfig, CompletionOptions};

// ============================================================================
// Message Conversion: toolbroker -> genai
// ============================================================================

/// Convert a MessageRole to a genai ChatRole
///
/// genai has no function-result role for plain transcripts; those entries are
/// replayed as user turns.
pub fn to_genai_role(role: MessageRole) -> GenaiRole {
    match role {
        MessageRole::System => GenaiRole::System,
        MessageRole::User | MessageRole::Function => GenaiRole::User,
        MessageRole::Assistant => GenaiRole::Assistant,
    }
}

/// Convert a transcript entry to a genai ChatMessage
pub fn to_genai_message(msg: &ChatMessage) -> GenaiMessage {
    match msg.role {
        MessageRole::System => GenaiMessage::system(GenaiContent::from(msg.content.clone())),
        MessageRole::User => GenaiMessage::user(GenaiContent::from(msg.content.clone())),
        MessageRole::Assistant => GenaiMessage::assistant(GenaiContent::from(msg.content.clone())),
        MessageRole::Function => {
            let name = msg.name.as_deref().unwrap_or("tool");
            GenaiMessage::user(GenaiContent::from(format!(
                "[Result of tool {}]: {}",
                name, msg.content
            )))
        }
    }
}

/// Convert a transcript to genai messages
pub fn to_genai_messages(messages: &[ChatMessage]) -> Vec<GenaiMessage> {
    messages.iter().map(to_genai_message).collect()
}

// ============================================================================
// Tool Conversion: toolbroker -> genai
// ============================================================================

/// Convert a Tool to a genai Tool
pub fn to_genai_tool(tool: &Tool) -> GenaiTool {
    let mut genai_tool = GenaiTool::new(&tool.name).with_description(&tool.description);

    if let Some(schema) = &tool.input_schema {
        genai_tool = genai_tool.with_schema(schema.clone());
    }

    genai_tool
}

/// Convert tools to genai tools
pub fn to_genai_tools(tools: &[Tool]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolbroker -> genai
// ============================================================================

/// Build the genai request for a transcript
///
/// genai has no tool-choice field: a request carrying tools is sent with the
/// upstream default, which is automatic selection. `ToolChoice::Auto` therefore
/// maps to "attach the tools" and `ToolChoice::None` to "attach nothing".
pub fn to_genai_request(messages: &[ChatMessage], options: &CompletionOptions) -> ChatRequest {
    let request = ChatRequest::new(to_genai_messages(messages));
    match options.offered_tools() {
        Some(tools) => request.with_tools(to_genai_tools(tools)),
        None => request,
    }
}

/// genai ChatOptions for a completion
pub fn to_genai_options() -> GenaiOptions {
    // Capture tool calls in stream so we can return them
    GenaiOptions::default().with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolbroker
// ============================================================================

/// Convert a genai ToolCall to our ToolCall
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall {
        id: tc.call_id.clone(),
        name: tc.fn_name.clone(),
        input: tc.fn_arguments.clone(),
    }
}

// ============================================================================
// Error Classification
// ============================================================================

const SCHEMA_REJECTION_MARKERS: &[&str] = &[
    "invalid_function_parameters",
    "invalid schema for function",
    "invalid_schema",
    "invalid json schema",
    "invalid tool schema",
];

/// Whether an upstream error message is a rejection of the function schemas
pub fn is_tool_schema_rejection(message: &str) -> bool {
    let message = message.to_lowercase();
    if SCHEMA_REJECTION_MARKERS.iter().any(|m| message.contains(m)) {
        return true;
    }
    message.contains("schema")
        && message.contains("invalid")
        && (message.contains("function") || message.contains("tool"))
}

/// Map a genai failure to a ProviderError, distinguishing schema rejection
pub fn map_genai_error(provider: &str, message: String) -> ProviderError {
    if is_tool_schema_rejection(&message) {
        ProviderError::invalid_tool_schema(provider, message)
    } else {
        ProviderError::api_error(provider, 500, message)
    }
}

// ============================================================================
// Provider Resolution
// ============================================================================

/// Provider configuration for routing
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier (e.g., "openai", "anthropic")
    pub provider: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl From<&BackendModelConfig> for ProviderConfig {
    fn from(config: &BackendModelConfig) -> Self {
        // Unprefixed model names ("o4-mini") route to OpenAI
        let provider = match config.model.split_once('/') {
            Some((provider, _)) => provider.to_string(),
            None => "openai".to_string(),
        };

        Self {
            provider,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }
}

/// Map a provider ID to the secret store key holding its credential
pub fn provider_to_secret_key(provider: &str) -> String {
    match provider.to_lowercase().as_str() {
        "" | "openai" => "openai".to_string(),
        "gemini" | "google" => "gemini".to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// Create a genai Client with custom auth and endpoint resolution
pub fn create_client(config: &ProviderConfig) -> Client {
    let auth_provider = config.provider.clone();
    let auth_explicit_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let provider = auth_provider.clone();
            let explicit_key = auth_explicit_key.clone();

            Box::pin(async move {
                if let Some(key) = explicit_key {
                    return Ok(Some(AuthData::from_single(key)));
                }

                let store = EnvSecretStore::new();
                // None lets genai report the missing credential itself
                Ok(store
                    .get(&provider_to_secret_key(&provider))
                    .map(AuthData::from_single))
            })
        },
    );

    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            // Custom endpoints are spoken to as OpenAI-compatible
            let Some(api_base) = target_api_base.as_ref() else {
                return Ok(target);
            };
            let ServiceTarget { ref model, .. } = target;
            let resolved_model = ModelIden::new(AdapterKind::OpenAI, model.model_name.clone());

            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(api_base.clone()),
                auth: target.auth,
                model: resolved_model,
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}
