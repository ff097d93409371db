//! Mock providers for testing
//!
//! Deterministic, in-process stand-ins for provider processes. Useful for
//! exercising the registry and the orchestrator without spawning anything.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::mcp::{McpError, McpResult, McpServerConfig, ToolOutcome};

use super::catalog::ToolInfo;
use super::provider::{ProviderLauncher, ToolProvider};

/// A scripted tool provider
pub struct MockToolProvider {
    name: String,
    tools: Mutex<Vec<ToolInfo>>,
    results: Mutex<HashMap<String, Value>>,
    failing_tools: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    calls: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
}

impl MockToolProvider {
    /// Create a provider with no tools
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Mutex::new(Vec::new()),
            results: Mutex::new(HashMap::new()),
            failing_tools: Mutex::new(HashSet::new()),
            fail_listing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Expose a tool
    pub fn with_tool(self, name: &str, description: &str, input_schema: Value) -> Self {
        self.tools
            .lock()
            .push(ToolInfo::new(self.name.clone(), name, description, input_schema));
        self
    }

    /// Fix the payload returned when `tool` is called
    pub fn with_result(self, tool: &str, payload: Value) -> Self {
        self.results.lock().insert(tool.to_string(), payload);
        self
    }

    /// Make calls to `tool` report a provider-side failure
    pub fn with_failing_tool(self, tool: &str) -> Self {
        self.failing_tools.lock().insert(tool.to_string());
        self
    }

    /// Make every `list_tools` call fail
    pub fn failing_listing(self) -> Self {
        self.fail_listing.store(true, Ordering::SeqCst);
        self
    }

    /// Every call received, in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> McpResult<Vec<ToolInfo>> {
        if self.is_closed() {
            return Err(McpError::NotInitialized {
                name: self.name.clone(),
            });
        }
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(McpError::Protocol {
                name: self.name.clone(),
                reason: "mock listing failure".to_string(),
            });
        }
        Ok(self.tools.lock().clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolOutcome> {
        if self.is_closed() {
            return Err(McpError::NotInitialized {
                name: self.name.clone(),
            });
        }
        self.calls.lock().push((name.to_string(), arguments.clone()));

        if self.failing_tools.lock().contains(name) {
            return Ok(ToolOutcome::Error {
                message: format!("mock failure in {}", name),
            });
        }

        let payload = self
            .results
            .lock()
            .get(name)
            .cloned()
            .unwrap_or_else(|| json!({ "tool": name, "arguments": arguments }));
        Ok(ToolOutcome::Success { payload })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Launcher handing out pre-built mock providers
#[derive(Default)]
pub struct MockLauncher {
    providers: Mutex<HashMap<String, Arc<MockToolProvider>>>,
    failures: Mutex<HashSet<String>>,
    launches: AtomicUsize,
}

impl MockLauncher {
    /// Create an empty launcher; unknown names launch providers with no tools
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the provider returned when `provider.name()` is launched
    pub fn with_provider(self, provider: MockToolProvider) -> Self {
        self.providers
            .lock()
            .insert(provider.name.clone(), Arc::new(provider));
        self
    }

    /// Make launching `name` fail as a handshake failure would
    pub fn with_failure(self, name: &str) -> Self {
        self.failures.lock().insert(name.to_string());
        self
    }

    /// The provider handed out for `name`, if launched or registered
    pub fn provider(&self, name: &str) -> Option<Arc<MockToolProvider>> {
        self.providers.lock().get(name).cloned()
    }

    /// Number of successful launches
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderLauncher for MockLauncher {
    async fn launch(&self, config: &McpServerConfig) -> McpResult<Arc<dyn ToolProvider>> {
        if self.failures.lock().contains(&config.name) {
            return Err(McpError::InitializationFailed {
                name: config.name.clone(),
                reason: "mock handshake failure".to_string(),
            });
        }

        let provider = Arc::clone(
            self.providers
                .lock()
                .entry(config.name.clone())
                .or_insert_with(|| Arc::new(MockToolProvider::new(config.name.clone()))),
        );
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(provider)
    }
}
