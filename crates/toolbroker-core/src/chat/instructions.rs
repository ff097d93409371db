//! System instructions derived from the tool catalog

use crate::tools::ToolInfo;
use crate::types::{ChatMessage, MessageRole};

const HEADER: &str = "You are a helpful assistant with access to these tools:";

const GUIDANCE: &str = "When you need to use a tool, respond ONLY with a JSON object in the exact format below and nothing else:
{
    \"tool\": \"tool-name\",
    \"arguments\": { /* argument names and values */ }
}
After the tool runs, you will receive the result and should continue the conversation naturally.";

/// Render the system instructions for the given catalog
///
/// Pure function of the catalog: the same tools always render the same text.
pub fn render_instructions(tools: &[ToolInfo]) -> String {
    let lines: Vec<String> = tools
        .iter()
        .map(|t| format!("{}: {}", t.name, t.description))
        .collect();

    format!("{}\n{}\n\n{}", HEADER, lines.join("\n"), GUIDANCE)
}

/// Seed or overwrite the transcript's system entry with `instructions`
pub fn apply_instructions(transcript: &mut Vec<ChatMessage>, instructions: String) {
    match transcript.first_mut() {
        Some(first) if first.role == MessageRole::System => first.content = instructions,
        _ => transcript.insert(0, ChatMessage::system(instructions)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_lists_every_tool() {
        let tools = vec![
            ToolInfo::new("calc", "add", "Add two numbers", json!({})),
            ToolInfo::new("clock", "now", "", json!({})),
        ];

        let text = render_instructions(&tools);
        assert!(text.starts_with(HEADER));
        assert!(text.contains("\nadd: Add two numbers\nnow: \n"));
        assert!(text.ends_with("continue the conversation naturally."));
    }

    #[test]
    fn test_render_empty_catalog() {
        let text = render_instructions(&[]);
        assert!(text.starts_with(HEADER));
        assert!(text.contains("\"tool\": \"tool-name\""));
    }

    #[test]
    fn test_apply_seeds_fresh_transcript() {
        let mut transcript = Vec::new();
        apply_instructions(&mut transcript, "v1".to_string());

        assert_eq!(transcript, vec![ChatMessage::system("v1")]);
    }

    #[test]
    fn test_apply_overwrites_existing_system_entry() {
        let mut transcript = vec![
            ChatMessage::system("v1"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        apply_instructions(&mut transcript, "v2".to_string());

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0], ChatMessage::system("v2"));
        assert_eq!(transcript[1], ChatMessage::user("hi"));
    }
}
