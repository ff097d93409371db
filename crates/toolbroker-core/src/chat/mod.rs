//! Conversation orchestration
//!
//! `ChatOrchestrator` drives one turn of a conversation: refresh the system
//! instructions from the live catalog, ask the backend, run a requested tool
//! through the `ProviderRegistry` and ask again for the follow-up.

mod error;
mod instructions;
mod orchestrator;
mod schema;
mod session;

pub use error::{ChatError, ChatResult};
pub use instructions::{apply_instructions, render_instructions};
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use schema::{empty_object_schema, function_schemas, is_object_schema};
pub use session::{new_session_id, SessionStore, SharedTranscript, DEFAULT_MAX_SESSIONS};
