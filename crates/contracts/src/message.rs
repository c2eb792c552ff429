//! Outbound network messages and endpoint descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::{SignalValue, SignalVector};

/// A single typed message argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageArg {
    Int32(i32),
    Float32(f32),
    Str(String),
}

impl From<SignalValue> for MessageArg {
    fn from(v: SignalValue) -> Self {
        match v {
            SignalValue::Int32(x) => Self::Int32(x),
            SignalValue::Float32(x) => Self::Float32(x),
        }
    }
}

/// Payload-level message: an address plus ordered typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub address: String,
    pub args: Vec<MessageArg>,
}

impl OutboundMessage {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// Value message: one argument per vector element, in index order.
    pub fn value(address: impl Into<String>, values: &SignalVector) -> Self {
        Self {
            address: address.into(),
            args: values.iter().map(MessageArg::from).collect(),
        }
    }

    pub fn with_arg(mut self, arg: MessageArg) -> Self {
        self.args.push(arg);
        self
    }
}

/// A resolved network endpoint of a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host as requested (before resolution)
    pub host: String,
    pub port: u16,
    /// Resolved socket address
    pub addr: SocketAddr,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.port, self.addr)
    }
}

/// The local device, referenced by every router it creates so that
/// queries can be stamped with a reply source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDevice {
    pub name: String,
    /// Address replies should come back to, once bound
    pub reply_addr: Option<SocketAddr>,
}

impl LocalDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply_addr: None,
        }
    }

    pub fn with_reply_addr(mut self, addr: SocketAddr) -> Self {
        self.reply_addr = Some(addr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_message_preserves_order() {
        let msg = OutboundMessage::value("/dest/x", &SignalVector::from(vec![1.0f32, 2.0]));
        assert_eq!(msg.address, "/dest/x");
        assert_eq!(
            msg.args,
            vec![MessageArg::Float32(1.0), MessageArg::Float32(2.0)]
        );
    }

    #[test]
    fn test_with_arg() {
        let msg = OutboundMessage::new("/dest/x/get").with_arg(MessageArg::Str("tag".into()));
        assert_eq!(msg.args.len(), 1);
    }
}
