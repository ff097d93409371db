//! GenaiBackend - chat backend using the genai crate
//!
//! Handles every genai-supported provider, plus OpenAI-compatible endpoints
//! when a custom `api_base` is configured.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use genai::chat::ChatStreamEvent;

use crate::logging::Logger;
use crate::types::{ChatMessage, Completion, ToolCall};

use super::error::{ProviderError, ProviderResult};
use super::genai_adapter::{
    create_client, from_genai_tool_call, map_genai_error, to_genai_options, to_genai_request,
    ProviderConfig,
};
use super::traits::{BackendModelConfig, ChatBackend, CompletionOptions};

/// Chat backend using genai for all supported LLM APIs
pub struct GenaiBackend {
    /// Provider identifier, derived from the model prefix
    provider_id: String,
    model_config: BackendModelConfig,
    /// Logger for debug output
    logger: Arc<dyn Logger>,
}

impl GenaiBackend {
    /// Create a backend for the given model
    pub fn new(model_config: BackendModelConfig, logger: Arc<dyn Logger>) -> Self {
        let provider_id = ProviderConfig::from(&model_config).provider;
        Self {
            provider_id,
            model_config,
            logger,
        }
    }

    /// Model string this backend sends requests for
    pub fn model(&self) -> &str {
        &self.model_config.model
    }

    /// Extract model name from a model string (e.g., "openai/gpt-4" -> "gpt-4")
    pub fn extract_model_name(model: &str) -> &str {
        model.split_once('/').map(|(_, name)| name).unwrap_or(model)
    }
}

#[async_trait]
impl ChatBackend for GenaiBackend {
    fn name(&self) -> &str {
        &self.provider_id
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> ProviderResult<Completion> {
        let client = create_client(&ProviderConfig::from(&self.model_config));

        let chat_req = to_genai_request(messages, &options);
        let genai_options = to_genai_options();
        let model_name = Self::extract_model_name(&self.model_config.model);

        self.logger.info(&format!(
            "[GenaiBackend] complete: provider={}, model={}, messages={}, tools={}",
            self.provider_id,
            model_name,
            messages.len(),
            options.offered_tools().map(|t| t.len()).unwrap_or(0)
        ));

        let chat_stream = client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| map_genai_error(&self.provider_id, e.to_string()))?;

        let mut stream = chat_stream.stream;
        let mut text = String::new();
        let mut streamed_call: Option<ToolCall> = None;
        let mut captured_call: Option<ToolCall> = None;

        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| {
                self.logger.error(&format!("[GenaiBackend] Stream error: {}", e));
                map_genai_error(&self.provider_id, e.to_string())
            })?;

            match event {
                ChatStreamEvent::Chunk(chunk) => text.push_str(&chunk.content),
                ChatStreamEvent::ToolCallChunk(chunk) => {
                    self.logger.debug("[GenaiBackend] Stream event: ToolCallChunk");
                    streamed_call = Some(from_genai_tool_call(&chunk.tool_call));
                }
                ChatStreamEvent::End(end) => {
                    self.logger.debug("[GenaiBackend] Stream event: End");
                    if let Some(tool_calls) = end.captured_tool_calls() {
                        if tool_calls.len() > 1 {
                            self.logger.warn(&format!(
                                "[GenaiBackend] Model requested {} tool calls; using the first",
                                tool_calls.len()
                            ));
                        }
                        if let Some(tc) = tool_calls.first() {
                            captured_call = Some(from_genai_tool_call(tc));
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(tool_call) = captured_call.or(streamed_call) {
            if tool_call.name.is_empty() {
                return Err(ProviderError::invalid_response(
                    &self.provider_id,
                    "tool call without a function name",
                ));
            }
            return Ok(Completion::tool_call(tool_call));
        }

        Ok(Completion::text(text))
    }
}
