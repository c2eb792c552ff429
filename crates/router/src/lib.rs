//! # Router
//!
//! Outbound signal routing.
//!
//! Responsibilities:
//! - One `DestinationRouter` per remote device, holding the mappings of
//!   local signals to that device's signals
//! - Dispatch of local value changes through transform and clip
//! - Query messages asking destinations for their current values
//! - A single-writer service owning the routing table

pub mod dispatch;
pub mod error;
pub mod evaluators;
pub mod metrics;
pub mod query;
pub mod registry;
pub mod router;
pub mod service;
pub mod transport;

pub use dispatch::{DispatchPipeline, DispatchReport};
pub use error::RouterError;
pub use evaluators::{BoundClip, IdentityTransform};
pub use metrics::{RouterMetrics, RouterStatsSnapshot};
pub use query::QUERY_SUFFIX;
pub use registry::{RouterId, RouterRegistry};
pub use router::{DestinationRouter, SignalDescriptor, SignalMappingEntry};
pub use service::{RouterHandle, RouterService};
pub use transport::{DnsResolver, MemoryTransport, StaticResolver, UdpTransport};
