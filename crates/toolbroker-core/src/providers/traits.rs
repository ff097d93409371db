//! LLM backend trait definition

use async_trait::async_trait;

use crate::types::{ChatMessage, Completion, Tool, ToolChoice};
use super::error::ProviderResult;

/// Model configuration for backend requests
#[derive(Debug, Clone)]
pub struct BackendModelConfig {
    /// Model identifier, optionally prefixed with the provider (`openai/o4-mini`)
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl BackendModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}

/// Options for one completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Function schemas the model may select from; `None` means plain chat
    pub tools: Option<Vec<Tool>>,
    /// `None` withholds the tools even when some are listed
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set tool choice
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    /// Tools that should actually be offered to the model
    pub fn offered_tools(&self) -> Option<&[Tool]> {
        match (self.tool_choice, &self.tools) {
            (Some(ToolChoice::None), _) => None,
            (_, Some(tools)) if !tools.is_empty() => Some(tools.as_slice()),
            _ => None,
        }
    }
}

/// A chat-completion backend
///
/// Takes a transcript and an optional function schema set and returns either
/// text or a single requested tool call.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name (e.g., "openai", "mock")
    fn name(&self) -> &str;

    /// Run one completion over the transcript
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> ProviderResult<Completion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offered_tools() {
        let opts = CompletionOptions::new();
        assert!(opts.offered_tools().is_none());

        let opts = CompletionOptions::new().with_tools(vec![]);
        assert!(opts.offered_tools().is_none());

        let opts = CompletionOptions::new().with_tools(vec![Tool::new("add", "Add")]);
        assert_eq!(opts.offered_tools().map(|t| t.len()), Some(1));

        let opts = opts.with_tool_choice(ToolChoice::None);
        assert!(opts.offered_tools().is_none());
    }

    #[test]
    fn test_model_config_builder() {
        let config = BackendModelConfig::new("o4-mini")
            .with_api_key("sk-test")
            .with_api_base("http://localhost:8080/v1/");
        assert_eq!(config.model, "o4-mini");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:8080/v1/"));
    }
}
