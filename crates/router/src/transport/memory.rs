//! MemoryTransport - records messages instead of sending them
//!
//! Test double for the UDP transport.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use contracts::{ContractError, Endpoint, LocalDevice, OutboundMessage, Transport};

/// Kind of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    Value,
    Query,
}

/// A message handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub kind: SentKind,
    pub target: SocketAddr,
    /// Device name the query was stamped with
    pub reply_source: Option<String>,
    pub message: OutboundMessage,
}

/// Transport that keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail (the message is still not recorded)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    /// Copy of all recorded messages, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Remove and return all recorded messages
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SentMessage>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(
        &self,
        kind: SentKind,
        endpoint: &Endpoint,
        reply_source: Option<&LocalDevice>,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(ContractError::transport(&message.address, "send failed"));
        }
        self.lock().push(SentMessage {
            kind,
            target: endpoint.addr,
            reply_source: reply_source.map(|d| d.name.clone()),
            message: message.clone(),
        });
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn transmit(
        &self,
        endpoint: &Endpoint,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        self.record(SentKind::Value, endpoint, None, message)
    }

    fn transmit_query(
        &self,
        endpoint: &Endpoint,
        reply_source: &LocalDevice,
        message: &OutboundMessage,
    ) -> Result<(), ContractError> {
        self.record(SentKind::Query, endpoint, Some(reply_source), message)
    }
}
