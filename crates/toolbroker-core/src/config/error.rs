//! Configuration error types

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
