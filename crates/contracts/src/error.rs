//! Layered error definitions
//!
//! Categorized by source: config / network / types, plus the per-element
//! evaluation failures that never leave the dispatch path.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Type Errors =====
    /// Element type tag outside {int32, float32}
    #[error("unsupported element type '{tag}'")]
    UnsupportedType { tag: String },

    // ===== Network Errors =====
    /// Endpoint could not be resolved
    #[error("cannot resolve address {host}:{port}: {message}")]
    AddressResolution {
        host: String,
        port: u16,
        message: String,
    },

    /// Transport-level send failure
    #[error("transport error sending to '{address}': {message}")]
    Transport { address: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create address resolution error
    pub fn address_resolution(host: impl Into<String>, port: u16, message: impl Into<String>) -> Self {
        Self::AddressResolution {
            host: host.into(),
            port,
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            address: address.into(),
            message: message.into(),
        }
    }
}

/// Failure evaluating one vector element of a mapping.
///
/// Aborts the affected mapping for the current event only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementFailure {
    #[error("transform failed: {0}")]
    Transform(String),

    #[error("clip failed: {0}")]
    Clip(String),

    #[error("mapping is muted")]
    Muted,

    #[error("unsupported expression '{0}'")]
    UnsupportedExpression(String),

    /// Source vector shorter than the mapping's length
    #[error("element {index} out of range for source vector of length {len}")]
    OutOfRange { index: usize, len: usize },
}
