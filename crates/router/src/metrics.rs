//! Router metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::SignalName;

/// Metrics for a single destination router
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Value messages handed to the transport
    messages_sent: AtomicU64,
    /// Query messages handed to the transport
    queries_sent: AtomicU64,
    /// Mapping evaluations abandoned because an element failed
    mappings_aborted: AtomicU64,
    /// Sends the transport reported as failed
    transport_failures: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn inc_messages_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queries_sent(&self) -> u64 {
        self.queries_sent.load(Ordering::Relaxed)
    }

    pub fn inc_queries_sent(&self) {
        self.queries_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mappings_aborted(&self) -> u64 {
        self.mappings_aborted.load(Ordering::Relaxed)
    }

    pub fn inc_mappings_aborted(&self) {
        self.mappings_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    pub fn inc_transport_failures(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self, dest_name: &SignalName, mapping_count: usize) -> RouterStatsSnapshot {
        RouterStatsSnapshot {
            dest_name: dest_name.clone(),
            mapping_count,
            messages_sent: self.messages_sent(),
            queries_sent: self.queries_sent(),
            mappings_aborted: self.mappings_aborted(),
            transport_failures: self.transport_failures(),
        }
    }
}

/// Snapshot of router metrics (for reporting)
#[derive(Debug, Clone)]
pub struct RouterStatsSnapshot {
    pub dest_name: SignalName,
    pub mapping_count: usize,
    pub messages_sent: u64,
    pub queries_sent: u64,
    pub mappings_aborted: u64,
    pub transport_failures: u64,
}
