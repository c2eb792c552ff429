//! DestinationRouter - one remote peer and the mappings that target it

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use contracts::{
    DestinationKey, ElementType, Endpoint, LocalDevice, LocalSignal, Mapping, MappingId,
    MappingUpdate, OutboundMessage, SignalId, SignalName, SignalVector, Transport,
};

use crate::error::RouterError;
use crate::metrics::{RouterMetrics, RouterStatsSnapshot};

/// Outbound signal descriptor: where and how a vector is sent.
#[derive(Debug, Clone, Copy)]
pub struct SignalDescriptor<'a> {
    pub name: &'a SignalName,
    pub element_type: ElementType,
    pub length: usize,
}

impl<'a> SignalDescriptor<'a> {
    /// Destination side of `mapping`
    pub fn destination_of(mapping: &'a Mapping) -> Self {
        Self {
            name: &mapping.dest_name,
            element_type: mapping.dest_type,
            length: mapping.dest_length,
        }
    }
}

/// Mappings of one local signal through one router, newest first.
#[derive(Debug)]
pub struct SignalMappingEntry {
    signal: SignalId,
    mappings: VecDeque<Mapping>,
}

impl SignalMappingEntry {
    fn new(signal: SignalId) -> Self {
        Self {
            signal,
            mappings: VecDeque::new(),
        }
    }

    pub fn signal(&self) -> SignalId {
        self.signal
    }

    /// Mappings in evaluation order (most recently added first)
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// A remote destination: its endpoint and every mapping that targets it.
///
/// A router only exists with a resolved endpoint; resolution happens in
/// [`RouterRegistry::create_router`](crate::RouterRegistry::create_router)
/// before construction.
pub struct DestinationRouter {
    dest_name: SignalName,
    key: DestinationKey,
    endpoint: Option<Endpoint>,
    transport: Arc<dyn Transport>,
    device: Arc<LocalDevice>,
    entries: Vec<SignalMappingEntry>,
    metrics: Arc<RouterMetrics>,
}

impl DestinationRouter {
    /// Create a router for an already-resolved endpoint
    pub fn new(
        dest_name: impl Into<SignalName>,
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
        device: Arc<LocalDevice>,
    ) -> Self {
        let dest_name = dest_name.into();
        let key = dest_name.destination_key();
        Self {
            dest_name,
            key,
            endpoint: Some(endpoint),
            transport,
            device,
            entries: Vec::new(),
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    pub fn dest_name(&self) -> &SignalName {
        &self.dest_name
    }

    pub fn key(&self) -> &DestinationKey {
        &self.key
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn device(&self) -> &LocalDevice {
        &self.device
    }

    pub fn metrics(&self) -> &Arc<RouterMetrics> {
        &self.metrics
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Whether `name` addresses this router (same first path segment)
    pub fn matches(&self, name: &str) -> bool {
        self.key == DestinationKey::parse(name)
    }

    /// Add a mapping from `source` to `dest_name`.
    ///
    /// The new mapping is evaluated before every mapping already attached
    /// to `source`.
    ///
    /// # Errors
    /// `LengthMismatch` if `source.length != dest_length`; nothing is
    /// changed in that case.
    pub fn add_mapping(
        &mut self,
        id: MappingId,
        source: &LocalSignal,
        dest_name: impl Into<SignalName>,
        dest_type: ElementType,
        dest_length: usize,
    ) -> Result<&Mapping, RouterError> {
        let dest_name = dest_name.into();

        // TODO: accept differing lengths once expressions can declare
        // their input and output lengths.
        if source.length != dest_length {
            debug!(
                source = %source.name,
                dest = %dest_name,
                source_length = source.length,
                dest_length,
                "Rejecting mapping, lengths don't match"
            );
            return Err(RouterError::length_mismatch(
                &source.name,
                &dest_name,
                source.length,
                dest_length,
            ));
        }

        let mapping = Mapping::new(id, source, dest_name, dest_type, dest_length);

        let idx = match self.entries.iter().position(|e| e.signal == source.id) {
            Some(idx) => idx,
            None => {
                self.entries.push(SignalMappingEntry::new(source.id));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[idx];
        entry.mappings.push_front(mapping);

        debug!(
            router = %self.dest_name,
            mapping = %id,
            source = %source.name,
            "Mapping added"
        );

        Ok(&entry.mappings[0])
    }

    /// Detach and return the mapping `id`.
    ///
    /// A signal whose last mapping is removed loses its entry.
    ///
    /// # Errors
    /// `MappingNotFound` if the mapping is not attached to this router.
    pub fn remove_mapping(&mut self, id: MappingId) -> Result<Mapping, RouterError> {
        let (entry_idx, mapping_idx) = self
            .locate(id)
            .ok_or(RouterError::MappingNotFound(id))?;

        let entry = &mut self.entries[entry_idx];
        let mapping = entry
            .mappings
            .remove(mapping_idx)
            .ok_or(RouterError::MappingNotFound(id))?;

        if entry.mappings.is_empty() {
            self.entries.swap_remove(entry_idx);
        }

        debug!(router = %self.dest_name, mapping = %id, "Mapping removed");
        Ok(mapping)
    }

    /// Apply a property update to the mapping `id`
    pub fn update_mapping(
        &mut self,
        id: MappingId,
        update: MappingUpdate,
    ) -> Result<&Mapping, RouterError> {
        let (entry_idx, mapping_idx) = self
            .locate(id)
            .ok_or(RouterError::MappingNotFound(id))?;

        let mapping = &mut self.entries[entry_idx].mappings[mapping_idx];
        mapping.apply(update);
        Ok(mapping)
    }

    pub fn mapping(&self, id: MappingId) -> Option<&Mapping> {
        self.locate(id)
            .map(|(e, m)| &self.entries[e].mappings[m])
    }

    /// Entry of `signal`, if it has any mappings here
    pub fn entry(&self, signal: SignalId) -> Option<&SignalMappingEntry> {
        self.entries.iter().find(|e| e.signal == signal)
    }

    pub fn entries(&self) -> &[SignalMappingEntry] {
        &self.entries
    }

    pub fn mapping_count(&self) -> usize {
        self.entries.iter().map(SignalMappingEntry::len).sum()
    }

    /// Send one vector to the descriptor's address.
    ///
    /// No-op without an endpoint. Transport failures are logged and
    /// counted, never returned. Returns whether the transport accepted it.
    pub fn send_vector(&self, descriptor: SignalDescriptor<'_>, values: &SignalVector) -> bool {
        let Some(endpoint) = self.endpoint.as_ref() else {
            return false;
        };

        let mut message = OutboundMessage::new(descriptor.name.as_str());
        message.args.reserve(descriptor.length);
        for value in values.iter().take(descriptor.length) {
            message.args.push(value.cast(descriptor.element_type).into());
        }

        match self.transport.transmit(endpoint, &message) {
            Ok(()) => {
                self.metrics.inc_messages_sent();
                observability::metrics::record_message_sent(self.dest_name.shared());
                true
            }
            Err(e) => {
                self.metrics.inc_transport_failures();
                observability::metrics::record_transport_failure(self.dest_name.shared());
                warn!(router = %self.dest_name, error = %e, "Send failed");
                false
            }
        }
    }

    /// Release the endpoint. Later sends and queries are no-ops.
    pub fn close(&mut self) {
        if self.endpoint.take().is_some() {
            debug!(router = %self.dest_name, "Router endpoint released");
        }
    }

    pub fn snapshot(&self) -> RouterStatsSnapshot {
        self.metrics.snapshot(&self.dest_name, self.mapping_count())
    }

    fn locate(&self, id: MappingId) -> Option<(usize, usize)> {
        self.entries.iter().enumerate().find_map(|(e, entry)| {
            entry
                .mappings
                .iter()
                .position(|m| m.id == id)
                .map(|m| (e, m))
        })
    }
}

impl std::fmt::Debug for DestinationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationRouter")
            .field("dest_name", &self.dest_name)
            .field("endpoint", &self.endpoint)
            .field("entries", &self.entries.len())
            .field("mappings", &self.mapping_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, SentKind};
    use contracts::{ClipPolicy, MessageArg};

    fn endpoint() -> Endpoint {
        Endpoint {
            host: "localhost".to_string(),
            port: 9000,
            addr: "127.0.0.1:9000".parse().unwrap(),
        }
    }

    fn router_with(transport: Arc<MemoryTransport>) -> DestinationRouter {
        DestinationRouter::new(
            "/dest",
            endpoint(),
            transport,
            Arc::new(LocalDevice::new("test_device")),
        )
    }

    fn signal(id: u32, length: usize) -> LocalSignal {
        LocalSignal::new(SignalId(id), format!("/sig{id}"), ElementType::Float32, length)
    }

    #[test]
    fn test_add_mapping_rejects_length_mismatch() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 2);

        let result = router.add_mapping(MappingId(1), &s, "/dest/x", ElementType::Float32, 3);

        assert!(matches!(result, Err(RouterError::LengthMismatch { .. })));
        assert!(router.entries().is_empty());
        assert_eq!(router.mapping_count(), 0);
    }

    #[test]
    fn test_add_mapping_newest_first() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 1);

        router
            .add_mapping(MappingId(1), &s, "/dest/a", ElementType::Float32, 1)
            .unwrap();
        router
            .add_mapping(MappingId(2), &s, "/dest/b", ElementType::Float32, 1)
            .unwrap();

        assert_eq!(router.entries().len(), 1);
        let ids: Vec<_> = router.entry(s.id).unwrap().mappings().map(|m| m.id).collect();
        assert_eq!(ids, vec![MappingId(2), MappingId(1)]);
    }

    #[test]
    fn test_one_entry_per_signal() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let a = signal(1, 1);
        let b = signal(2, 1);

        router.add_mapping(MappingId(1), &a, "/dest/a", ElementType::Float32, 1).unwrap();
        router.add_mapping(MappingId(2), &b, "/dest/b", ElementType::Float32, 1).unwrap();
        router.add_mapping(MappingId(3), &a, "/dest/c", ElementType::Float32, 1).unwrap();

        assert_eq!(router.entries().len(), 2);
        assert_eq!(router.entry(a.id).unwrap().len(), 2);
        assert_eq!(router.entry(b.id).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_mapping() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 1);
        router.add_mapping(MappingId(1), &s, "/dest/a", ElementType::Float32, 1).unwrap();
        router.add_mapping(MappingId(2), &s, "/dest/b", ElementType::Float32, 1).unwrap();

        let removed = router.remove_mapping(MappingId(1)).unwrap();
        assert_eq!(removed.dest_name, "/dest/a");
        assert_eq!(router.mapping_count(), 1);
        assert!(router.mapping(MappingId(1)).is_none());
    }

    #[test]
    fn test_remove_last_mapping_prunes_entry() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 1);
        router.add_mapping(MappingId(1), &s, "/dest/a", ElementType::Float32, 1).unwrap();

        router.remove_mapping(MappingId(1)).unwrap();
        assert!(router.entry(s.id).is_none());
    }

    #[test]
    fn test_remove_unknown_mapping_leaves_state() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 1);
        router.add_mapping(MappingId(1), &s, "/dest/a", ElementType::Float32, 1).unwrap();

        let result = router.remove_mapping(MappingId(42));
        assert!(matches!(result, Err(RouterError::MappingNotFound(MappingId(42)))));
        assert_eq!(router.mapping_count(), 1);
        assert!(router.mapping(MappingId(1)).is_some());
    }

    #[test]
    fn test_update_mapping() {
        let mut router = router_with(Arc::new(MemoryTransport::new()));
        let s = signal(1, 1);
        router.add_mapping(MappingId(1), &s, "/dest/a", ElementType::Float32, 1).unwrap();

        let m = router
            .update_mapping(
                MappingId(1),
                MappingUpdate {
                    clip_min: Some(ClipPolicy::Bound(0.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(m.clip_min, ClipPolicy::Bound(0.0));

        assert!(router.update_mapping(MappingId(9), MappingUpdate::default()).is_err());
    }

    #[test]
    fn test_send_vector_uses_descriptor_type() {
        let transport = Arc::new(MemoryTransport::new());
        let router = router_with(transport.clone());
        let name = SignalName::from("/dest/x");

        let sent = router.send_vector(
            SignalDescriptor {
                name: &name,
                element_type: ElementType::Int32,
                length: 2,
            },
            &SignalVector::from(vec![1.0f32, 2.5]),
        );

        assert!(sent);
        let msgs = transport.sent();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].kind, SentKind::Value);
        assert_eq!(msgs[0].message.address, "/dest/x");
        assert_eq!(msgs[0].message.args, vec![MessageArg::Int32(1), MessageArg::Int32(2)]);
        assert_eq!(router.metrics().messages_sent(), 1);
    }

    #[test]
    fn test_send_vector_after_close_is_noop() {
        let transport = Arc::new(MemoryTransport::new());
        let mut router = router_with(transport.clone());
        router.close();

        let name = SignalName::from("/dest/x");
        let sent = router.send_vector(
            SignalDescriptor {
                name: &name,
                element_type: ElementType::Float32,
                length: 1,
            },
            &SignalVector::from(vec![1.0f32]),
        );

        assert!(!sent);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_send_vector_transport_failure_counted() {
        let transport = Arc::new(MemoryTransport::new());
        transport.set_failing(true);
        let router = router_with(transport.clone());

        let name = SignalName::from("/dest/x");
        let sent = router.send_vector(
            SignalDescriptor {
                name: &name,
                element_type: ElementType::Float32,
                length: 1,
            },
            &SignalVector::from(vec![1.0f32]),
        );

        assert!(!sent);
        assert_eq!(router.metrics().transport_failures(), 1);
    }

    #[test]
    fn test_matches_first_segment() {
        let router = router_with(Arc::new(MemoryTransport::new()));
        assert!(router.matches("/dest/x"));
        assert!(router.matches("/dest"));
        assert!(!router.matches("/destination/x"));
    }
}
