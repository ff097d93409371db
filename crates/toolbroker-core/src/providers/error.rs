//! LLM backend error types

use thiserror::Error;

/// Errors that can occur while talking to an LLM backend
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Missing API key
    #[error("API key is required for {provider}")]
    MissingApiKey { provider: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    ApiError {
        provider: String,
        status: u16,
        message: String,
    },

    /// The backend rejected the function schema set of the request
    #[error("{provider} rejected the tool schemas: {message}")]
    InvalidToolSchema { provider: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid response from provider
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Create an API error
    pub fn api_error(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    /// Create an invalid tool schema error
    pub fn invalid_tool_schema(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidToolSchema {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this is the upstream rejection of the function schema set
    pub fn is_schema_rejection(&self) -> bool {
        matches!(self, Self::InvalidToolSchema { .. })
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_schema_rejection_is_flagged() {
        assert!(ProviderError::invalid_tool_schema("openai", "bad").is_schema_rejection());
        assert!(!ProviderError::api_error("openai", 500, "down").is_schema_rejection());
        assert!(!ProviderError::missing_api_key("openai").is_schema_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = ProviderError::api_error("openai", 503, "unavailable");
        assert_eq!(err.to_string(), "openai API error (503): unavailable");

        let err = ProviderError::invalid_tool_schema("openai", "properties missing");
        assert!(err.to_string().contains("rejected the tool schemas"));
    }
}
