//! LLM backends
//!
//! The orchestrator consumes the LLM as an opaque `ChatBackend`: a transcript
//! and an optional function schema set go in, text or one tool call comes out.
//!
//! ## Architecture
//!
//! `GenaiBackend` uses the `genai` crate, which handles:
//! - Provider-specific protocols (OpenAI, Anthropic, Gemini, etc.)
//! - Streaming and tool-call capture
//!
//! A custom `api_base` is routed through genai's `ServiceTargetResolver` as an
//! OpenAI-compatible endpoint. `MockBackend` is kept for testing.

mod traits;
mod error;
mod genai_adapter;
mod genai_backend;
mod mock;

// Core traits and types
pub use traits::{BackendModelConfig, ChatBackend, CompletionOptions};
pub use error::{ProviderError, ProviderResult};

// The real backend - handles all LLM providers via genai
pub use genai_backend::GenaiBackend;
pub use genai_adapter::is_tool_schema_rejection;

// Scripted backend for testing
pub use mock::{MockBackend, MockReply, RecordedRequest};
