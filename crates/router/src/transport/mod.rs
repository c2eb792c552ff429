//! Transport implementations
//!
//! Contains the OSC codec, UdpTransport, MemoryTransport and the endpoint
//! resolvers.

mod memory;
pub mod osc;
mod resolver;
mod udp;

pub use self::memory::{MemoryTransport, SentKind, SentMessage};
pub use self::resolver::{DnsResolver, StaticResolver};
pub use self::udp::{UdpTransport, MAX_PACKET_SIZE};
