//! Tool management module
//!
//! This module owns the set of running tool providers and the aggregated
//! catalog of the tools they expose.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ProviderRegistry                           │
//! │                                             │
//! │  - Starts/stops named providers             │
//! │  - Aggregates tools/list from each          │
//! │  - Routes tools/call to the owning provider │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ MCP over stdio (tools/list, tools/call)
//!           ▼
//! ┌─────────────────────────────────────────────┐
//! │  Provider processes (one per name)          │
//! └─────────────────────────────────────────────┘
//! ```

mod catalog;
pub mod mock;
mod provider;
mod registry;

pub use catalog::{collect_tools, find_owner, ToolInfo};
pub use mock::{MockLauncher, MockToolProvider};
pub use provider::{ProviderLauncher, StdioLauncher, ToolProvider};
pub use registry::ProviderRegistry;
