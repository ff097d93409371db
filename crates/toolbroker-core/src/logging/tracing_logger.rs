//! Logger backed by the `tracing` crate
//!
//! Lets hosts that already install a `tracing` subscriber receive the
//! broker's diagnostics as structured events with a `component` field.

use super::traits::Logger;

/// Forwards every message to the matching `tracing` macro
#[derive(Debug, Clone)]
pub struct TracingLogger {
    component: String,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("toolbroker")
    }
}

impl TracingLogger {
    /// Create a tracing logger tagging events with `component`
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(component = %self.component, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_without_subscriber() {
        // No subscriber installed: events are dropped silently
        let logger = TracingLogger::default();
        assert_eq!(logger.component, "toolbroker");
        logger.info("info message");
        logger.warn("warn message");
    }
}
