//! Tool catalog aggregation
//!
//! The catalog is never cached: each call asks every active provider for its
//! current tools. A provider that fails to answer is left out of that
//! catalog instead of failing the whole request.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::logging::Logger;
use crate::mcp::{McpResult, McpTool};

use super::provider::ToolProvider;

/// A tool as exposed by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name
    pub name: String,
    /// Tool description, empty when the provider gives none
    pub description: String,
    /// JSON Schema for tool parameters, `{}` when the provider gives none
    pub input_schema: Value,
    /// Name of the provider that owns this tool
    #[serde(default)]
    pub provider: String,
}

impl ToolInfo {
    /// Create a tool descriptor
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: normalize_schema(input_schema),
            provider: provider.into(),
        }
    }

    /// Convert an MCP tool definition, normalizing missing fields
    pub fn from_mcp(provider: &str, tool: McpTool) -> Self {
        Self::new(
            provider,
            tool.name.to_string(),
            tool.description.map(|s| s.to_string()).unwrap_or_default(),
            Value::Object((*tool.input_schema).clone()),
        )
    }
}

fn normalize_schema(schema: Value) -> Value {
    match schema {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}

async fn list_all(
    providers: &[Arc<dyn ToolProvider>],
) -> Vec<(&Arc<dyn ToolProvider>, McpResult<Vec<ToolInfo>>)> {
    join_all(
        providers
            .iter()
            .map(|provider| async move { (provider, provider.list_tools().await) }),
    )
    .await
}

/// Concatenate the tool lists of `providers`, in provider order
pub async fn collect_tools(providers: &[Arc<dyn ToolProvider>], logger: &dyn Logger) -> Vec<ToolInfo> {
    let mut tools = Vec::new();

    for (provider, listing) in list_all(providers).await {
        match listing {
            Ok(listed) => tools.extend(listed),
            Err(e) => logger.warn(&format!(
                "[ToolCatalog] Skipping provider '{}': {}",
                provider.name(),
                e
            )),
        }
    }

    tools
}

/// Find the first provider, in provider order, whose current tools include `tool_name`
pub async fn find_owner(
    providers: &[Arc<dyn ToolProvider>],
    tool_name: &str,
    logger: &dyn Logger,
) -> Option<Arc<dyn ToolProvider>> {
    for (provider, listing) in list_all(providers).await {
        match listing {
            Ok(listed) if listed.iter().any(|t| t.name == tool_name) => {
                return Some(Arc::clone(provider));
            }
            Ok(_) => {}
            Err(e) => logger.warn(&format!(
                "[ToolCatalog] Provider '{}' could not list tools while resolving '{}': {}",
                provider.name(),
                tool_name,
                e
            )),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::tools::mock::MockToolProvider;
    use serde_json::json;

    fn providers(list: Vec<MockToolProvider>) -> Vec<Arc<dyn ToolProvider>> {
        list.into_iter()
            .map(|p| Arc::new(p) as Arc<dyn ToolProvider>)
            .collect()
    }

    #[test]
    fn test_null_schema_is_normalized() {
        let info = ToolInfo::new("p", "t", "", Value::Null);
        assert_eq!(info.input_schema, json!({}));
    }

    #[tokio::test]
    async fn test_collect_preserves_provider_order() {
        let providers = providers(vec![
            MockToolProvider::new("b").with_tool("beta", "second", json!({})),
            MockToolProvider::new("a").with_tool("alpha", "first", json!({})),
        ]);

        let tools = collect_tools(&providers, &NoOpLogger).await;
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["beta", "alpha"]);
        assert_eq!(tools[0].provider, "b");
    }

    #[tokio::test]
    async fn test_broken_provider_is_skipped() {
        let providers = providers(vec![
            MockToolProvider::new("broken").with_tool("hidden", "", json!({})).failing_listing(),
            MockToolProvider::new("healthy").with_tool("add", "Add numbers", json!({})),
        ]);

        let tools = collect_tools(&providers, &NoOpLogger).await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "add");
    }

    #[tokio::test]
    async fn test_find_owner_picks_first_match() {
        let providers = providers(vec![
            MockToolProvider::new("broken").with_tool("add", "", json!({})).failing_listing(),
            MockToolProvider::new("first").with_tool("add", "", json!({})),
            MockToolProvider::new("second").with_tool("add", "", json!({})),
        ]);

        let owner = find_owner(&providers, "add", &NoOpLogger).await.unwrap();
        assert_eq!(owner.name(), "first");
        assert!(find_owner(&providers, "missing", &NoOpLogger).await.is_none());
    }
}
