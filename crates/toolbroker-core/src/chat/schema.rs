//! Function schemas offered to the model
//!
//! Provider input schemas are passed through only when they are well-formed
//! object schemas; anything else is replaced with an empty object schema so a
//! malformed document never reaches the backend.

use serde_json::{json, Value};

use crate::logging::Logger;
use crate::tools::ToolInfo;
use crate::types::Tool;

/// `{"type": "object", "properties": {}}`
pub fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Whether `schema` declares `type: object` and carries a `properties` map
pub fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
        && schema.get("properties").map_or(false, Value::is_object)
}

/// Build one function schema per catalog tool, in catalog order
pub fn function_schemas(tools: &[ToolInfo], logger: &dyn Logger) -> Vec<Tool> {
    tools
        .iter()
        .map(|tool| {
            let schema = if is_object_schema(&tool.input_schema) {
                tool.input_schema.clone()
            } else {
                logger.debug(&format!(
                    "[ChatSchema] Substituting empty schema for '{}' from provider '{}'",
                    tool.name, tool.provider
                ));
                empty_object_schema()
            };
            Tool::new(&tool.name, &tool.description).with_schema(schema)
        })
        .collect()
}
