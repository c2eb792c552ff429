//! Collaborator interfaces consumed by the router core.
//!
//! Endpoint resolution, message transmission and per-element evaluation
//! are implemented outside the core; these traits are their contracts.

use crate::{ContractError, ElementFailure, Endpoint, LocalDevice, LocalSignal, Mapping};
use crate::{OutboundMessage, SignalValue};

/// Endpoint resolution.
///
/// Resolution may perform DNS lookups and is therefore async; it only runs
/// when a router is created, never on the dispatch path.
#[trait_variant::make(EndpointResolver: Send)]
pub trait LocalEndpointResolver {
    /// Resolve `host:port` to a usable endpoint
    ///
    /// # Errors
    /// Returns `ContractError::AddressResolution` if the host cannot be resolved
    async fn resolve(&self, host: &str, port: u16) -> Result<Endpoint, ContractError>;
}

/// Message transmission.
///
/// Both methods are fire-and-forget: they never wait for the peer, and
/// their errors are only logged by the caller.
pub trait Transport: Send + Sync {
    /// Send a value message to `endpoint`.
    fn transmit(&self, endpoint: &Endpoint, message: &OutboundMessage)
        -> Result<(), ContractError>;

    /// Send a query message to `endpoint` so that the reply returns to
    /// `reply_source`.
    fn transmit_query(
        &self,
        endpoint: &Endpoint,
        reply_source: &LocalDevice,
        message: &OutboundMessage,
    ) -> Result<(), ContractError>;
}

/// Computes the mapped value of one element.
pub trait TransformEvaluator: Send + Sync {
    fn transform(
        &self,
        mapping: &Mapping,
        source: &LocalSignal,
        element: SignalValue,
    ) -> Result<SignalValue, ElementFailure>;
}

/// Computes the bounded form of one transformed element.
pub trait ClipEvaluator: Send + Sync {
    fn clip(&self, mapping: &Mapping, element: SignalValue) -> Result<SignalValue, ElementFailure>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn transmit(
        &self,
        endpoint: &Endpoint,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        (**self).transmit(endpoint, message)
    }

    fn transmit_query(
        &self,
        endpoint: &Endpoint,
        reply_source: &LocalDevice,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        (**self).transmit_query(endpoint, reply_source, message)
    }
}
