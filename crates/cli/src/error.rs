//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Signal not declared in the configuration
    #[error("Unknown signal: {name}")]
    UnknownSignal { name: String },

    /// Malformed input line or value list
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Mapping references a destination with no router
    #[error("No router for destination '{destination}'")]
    MissingRouter { destination: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn unknown_signal(name: impl Into<String>) -> Self {
        Self::UnknownSignal { name: name.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn missing_router(destination: impl Into<String>) -> Self {
        Self::MissingRouter {
            destination: destination.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
