//! Provider registry
//!
//! The ProviderRegistry is the central component for:
//! - Starting and stopping named tool providers (at most one per name)
//! - Aggregating their tools into one catalog
//! - Routing a tool invocation to the provider that owns the tool
//!
//! Add/remove are serialized through one lifecycle lock. Readers work on a
//! snapshot of the provider list taken under a short read lock, so they see
//! the set either before or after a mutation, never a half-started entry.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::logging::Logger;
use crate::mcp::{McpError, McpResult, McpServerConfig, ProcessTimeouts};

use super::catalog::{self, ToolInfo};
use super::provider::{ProviderLauncher, StdioLauncher, ToolProvider};

#[derive(Clone)]
struct ProviderEntry {
    config: McpServerConfig,
    provider: Arc<dyn ToolProvider>,
}

/// Registry of running tool providers, in registration order
pub struct ProviderRegistry {
    launcher: Arc<dyn ProviderLauncher>,
    entries: RwLock<Vec<ProviderEntry>>,
    lifecycle: Mutex<()>,
    logger: Arc<dyn Logger>,
}

impl ProviderRegistry {
    /// Create a registry using a custom launcher
    pub fn new(launcher: Arc<dyn ProviderLauncher>, logger: Arc<dyn Logger>) -> Self {
        Self {
            launcher,
            entries: RwLock::new(Vec::new()),
            lifecycle: Mutex::new(()),
            logger,
        }
    }

    /// Create a registry that launches stdio MCP processes
    pub fn stdio(timeouts: ProcessTimeouts, logger: Arc<dyn Logger>) -> Self {
        let launcher = Arc::new(StdioLauncher::new(timeouts, Arc::clone(&logger)));
        Self::new(launcher, logger)
    }

    /// Start a provider and register it under `config.name`
    ///
    /// Fails with `DuplicateName` without touching the existing provider, or
    /// with the launch error after the launcher has cleaned up.
    pub async fn add(&self, config: McpServerConfig) -> McpResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.contains(&config.name) {
            self.logger.warn(&format!(
                "[ProviderRegistry] Provider '{}' already exists",
                config.name
            ));
            return Err(McpError::DuplicateName(config.name));
        }

        let provider = match self.launcher.launch(&config).await {
            Ok(provider) => provider,
            Err(e) => {
                self.logger.error(&format!(
                    "[ProviderRegistry] Error starting provider '{}': {}",
                    config.name, e
                ));
                return Err(e);
            }
        };

        self.logger.info(&format!("[ProviderRegistry] Added provider '{}'", config.name));
        self.entries.write().push(ProviderEntry { config, provider });

        Ok(())
    }

    /// Stop a provider and drop it from the registry
    ///
    /// The entry is unpublished first, so concurrent readers stop seeing it
    /// before its process is shut down.
    pub async fn remove(&self, name: &str) -> McpResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let entry = {
            let mut entries = self.entries.write();
            let position = entries
                .iter()
                .position(|e| e.config.name == name)
                .ok_or_else(|| McpError::ProviderNotFound(name.to_string()))?;
            entries.remove(position)
        };

        entry.provider.close().await;
        self.logger.info(&format!("[ProviderRegistry] Removed provider '{}'", name));

        Ok(())
    }

    /// Names of all registered providers, in registration order
    pub fn list_names(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.config.name.clone()).collect()
    }

    /// Whether a provider with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|e| e.config.name == name)
    }

    /// Launch configuration of a registered provider
    pub fn config(&self, name: &str) -> Option<McpServerConfig> {
        self.entries
            .read()
            .iter()
            .find(|e| e.config.name == name)
            .map(|e| e.config.clone())
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no provider is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Arc<dyn ToolProvider>> {
        self.entries
            .read()
            .iter()
            .map(|e| Arc::clone(&e.provider))
            .collect()
    }

    fn get(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.config.name == name)
            .map(|e| Arc::clone(&e.provider))
    }

    /// Every active provider's current tools, broken providers skipped
    pub async fn catalog(&self) -> Vec<ToolInfo> {
        let providers = self.snapshot();
        catalog::collect_tools(&providers, self.logger.as_ref()).await
    }

    /// Tools of one provider, or the whole catalog when `name` is `None`
    ///
    /// A named provider that cannot list its tools surfaces its error.
    pub async fn list_tools(&self, name: Option<&str>) -> McpResult<Vec<ToolInfo>> {
        match name {
            Some(name) => {
                let provider = self
                    .get(name)
                    .ok_or_else(|| McpError::ProviderNotFound(name.to_string()))?;
                provider.list_tools().await
            }
            None => Ok(self.catalog().await),
        }
    }

    /// Route a tool call to the first provider that currently exposes the tool
    pub async fn resolve_and_invoke(&self, tool_name: &str, arguments: Value) -> McpResult<Value> {
        let providers = self.snapshot();
        let provider = catalog::find_owner(&providers, tool_name, self.logger.as_ref())
            .await
            .ok_or_else(|| McpError::ToolNotFound(tool_name.to_string()))?;

        self.logger.info(&format!(
            "[ProviderRegistry] Routing '{}' to provider '{}'",
            tool_name,
            provider.name()
        ));

        provider
            .call_tool(tool_name, arguments)
            .await?
            .into_payload(tool_name)
    }

    /// Stop every provider, best effort
    pub async fn shutdown(&self) {
        let _lifecycle = self.lifecycle.lock().await;
        let entries: Vec<ProviderEntry> = std::mem::take(&mut *self.entries.write());

        if !entries.is_empty() {
            self.logger.info(&format!(
                "[ProviderRegistry] Shutting down {} providers",
                entries.len()
            ));
        }
        join_all(entries.iter().map(|e| e.provider.close())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::tools::mock::{MockLauncher, MockToolProvider};
    use serde_json::json;

    fn registry(launcher: MockLauncher) -> (ProviderRegistry, Arc<MockLauncher>) {
        let launcher = Arc::new(launcher);
        let registry = ProviderRegistry::new(launcher.clone(), Arc::new(NoOpLogger));
        (registry, launcher)
    }

    fn config(name: &str) -> McpServerConfig {
        McpServerConfig::new(name, "unused")
    }

    #[tokio::test]
    async fn test_add_and_list_names_in_registration_order() {
        let (registry, _) = registry(MockLauncher::new());
        registry.add(config("b")).await.unwrap();
        registry.add(config("a")).await.unwrap();

        assert_eq!(registry.list_names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.config("a").unwrap().command, "unused");
    }

    #[tokio::test]
    async fn test_duplicate_name_leaves_existing_provider_running() {
        let (registry, launcher) = registry(MockLauncher::new());
        registry.add(config("calc")).await.unwrap();

        let err = registry.add(config("calc")).await.unwrap_err();
        assert!(matches!(err, McpError::DuplicateName(ref n) if n == "calc"));

        assert_eq!(launcher.launch_count(), 1);
        assert!(!launcher.provider("calc").unwrap().is_closed());
        assert_eq!(registry.list_names(), vec!["calc"]);
    }

    #[tokio::test]
    async fn test_failed_launch_is_not_registered() {
        let (registry, _) = registry(MockLauncher::new().with_failure("bad"));

        let err = registry.add(config("bad")).await.unwrap_err();
        assert!(err.is_launch_failure());
        assert!(registry.is_empty());

        // The name stays free for a later attempt
        assert!(!registry.contains("bad"));
    }

    #[tokio::test]
    async fn test_remove_closes_provider() {
        let (registry, launcher) = registry(MockLauncher::new());
        registry.add(config("calc")).await.unwrap();

        registry.remove("calc").await.unwrap();
        assert!(registry.list_names().is_empty());
        assert!(launcher.provider("calc").unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_remove_unknown_name() {
        let (registry, _) = registry(MockLauncher::new());
        let err = registry.remove("ghost").await.unwrap_err();
        assert!(matches!(err, McpError::ProviderNotFound(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn test_list_tools_by_name_and_all() {
        let (registry, _) = registry(
            MockLauncher::new()
                .with_provider(MockToolProvider::new("calc").with_tool("add", "Add", json!({})))
                .with_provider(MockToolProvider::new("clock").with_tool("now", "Time", json!({}))),
        );
        registry.add(config("calc")).await.unwrap();
        registry.add(config("clock")).await.unwrap();

        let calc = registry.list_tools(Some("calc")).await.unwrap();
        assert_eq!(calc.len(), 1);
        assert_eq!(calc[0].name, "add");

        let all = registry.list_tools(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let err = registry.list_tools(Some("ghost")).await.unwrap_err();
        assert!(matches!(err, McpError::ProviderNotFound(_)));
    }

    #[tokio::test]
    async fn test_catalog_skips_broken_provider() {
        let (registry, _) = registry(
            MockLauncher::new()
                .with_provider(
                    MockToolProvider::new("broken")
                        .with_tool("x", "", json!({}))
                        .failing_listing(),
                )
                .with_provider(MockToolProvider::new("calc").with_tool("add", "Add", json!({}))),
        );
        registry.add(config("broken")).await.unwrap();
        registry.add(config("calc")).await.unwrap();

        let catalog = registry.catalog().await;
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "add");
    }

    #[tokio::test]
    async fn test_resolve_and_invoke_routes_to_owner() {
        let (registry, launcher) = registry(
            MockLauncher::new()
                .with_provider(MockToolProvider::new("clock").with_tool("now", "", json!({})))
                .with_provider(
                    MockToolProvider::new("calc")
                        .with_tool("add", "", json!({}))
                        .with_result("add", json!({ "value": 4 })),
                ),
        );
        registry.add(config("clock")).await.unwrap();
        registry.add(config("calc")).await.unwrap();

        let result = registry
            .resolve_and_invoke("add", json!({ "a": 2, "b": 2 }))
            .await
            .unwrap();
        assert_eq!(result, json!({ "value": 4 }));

        let calls = launcher.provider("calc").unwrap().calls();
        assert_eq!(calls, vec![("add".to_string(), json!({ "a": 2, "b": 2 }))]);
        assert!(launcher.provider("clock").unwrap().calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_tool() {
        let (registry, _) = registry(MockLauncher::new());

        // Empty catalog
        let err = registry.resolve_and_invoke("add", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(ref t) if t == "add"));

        registry.add(config("empty")).await.unwrap();
        let err = registry.resolve_and_invoke("add", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_reports_provider_failure() {
        let (registry, _) = registry(MockLauncher::new().with_provider(
            MockToolProvider::new("calc")
                .with_tool("divide", "", json!({}))
                .with_failing_tool("divide"),
        ));
        registry.add(config("calc")).await.unwrap();

        let err = registry.resolve_and_invoke("divide", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::ToolCallFailed { ref tool, .. } if tool == "divide"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let (registry, launcher) = registry(MockLauncher::new());
        registry.add(config("a")).await.unwrap();
        registry.add(config("b")).await.unwrap();

        registry.shutdown().await;
        assert!(registry.is_empty());
        assert!(launcher.provider("a").unwrap().is_closed());
        assert!(launcher.provider("b").unwrap().is_closed());
    }

    #[tokio::test]
    async fn test_concurrent_adds_of_same_name_start_once() {
        let (registry, launcher) = registry(MockLauncher::new());
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.add(config("calc")).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(launcher.launch_count(), 1);
    }
}
