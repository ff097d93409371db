//! Logging abstractions
//!
//! Every component receives an `Arc<dyn Logger>` instead of writing to a
//! global sink, so embedders decide where diagnostics go.

mod traits;
mod noop;
mod tracing_logger;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use tracing_logger::TracingLogger;
