//! # Contracts
//!
//! Frozen interface contracts shared by the routing crates: signal and
//! mapping data, outbound message shapes, and the collaborator traits
//! (endpoint resolution, transport, transform and clip evaluators).
//! All business crates depend on this crate, never the other way round.
//!
//! ## Threading Model
//! - Mapping tables are mutated and dispatched from a single writer
//! - Collaborators must be `Send + Sync` so the writer can live in a task

mod blueprint;
mod error;
mod mapping;
mod message;
mod signal;
mod signal_name;
mod transport;

pub use blueprint::*;
pub use error::*;
pub use mapping::*;
pub use message::*;
pub use signal::*;
pub use signal_name::{DestinationKey, SignalName};
pub use transport::{
    ClipEvaluator, EndpointResolver, LocalEndpointResolver, TransformEvaluator, Transport,
};
