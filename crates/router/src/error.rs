//! Router error types

use thiserror::Error;

use contracts::{MappingId, SignalName};

use crate::registry::RouterId;

/// Router-specific errors
#[derive(Debug, Error)]
pub enum RouterError {
    /// Endpoint resolution failed; no router was registered
    #[error("cannot resolve endpoint {host}:{port} for '{dest_name}': {message}")]
    AddressResolution {
        host: String,
        port: u16,
        dest_name: String,
        message: String,
    },

    /// Source and destination vector lengths differ
    #[error(
        "rejecting mapping {source_name} -> {dest_name}: length {source_length} != {dest_length} (not supported)"
    )]
    LengthMismatch {
        source_name: SignalName,
        dest_name: SignalName,
        source_length: usize,
        dest_length: usize,
    },

    /// Mapping is not attached to the addressed router
    #[error("mapping {0} not found")]
    MappingNotFound(MappingId),

    /// No router registered under this id
    #[error("router {0} not found")]
    RouterNotFound(RouterId),

    /// Routing service task has stopped
    #[error("routing service is not running")]
    ServiceClosed,

    /// Contract-level error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl RouterError {
    /// Create a length mismatch error
    pub fn length_mismatch(
        source_name: &SignalName,
        dest_name: &SignalName,
        source_length: usize,
        dest_length: usize,
    ) -> Self {
        Self::LengthMismatch {
            source_name: source_name.clone(),
            dest_name: dest_name.clone(),
            source_length,
            dest_length,
        }
    }
}
