//! Query initiator - pull requests for the current remote values

use tracing::{debug, warn};

use contracts::{LocalSignal, MessageArg, OutboundMessage};

use crate::router::DestinationRouter;

/// Suffix appended to a destination signal name to form its query address
pub const QUERY_SUFFIX: &str = "/get";

impl DestinationRouter {
    /// Ask every destination `source` is mapped to for its current value.
    ///
    /// Each query is stamped with the local device as reply source and
    /// carries `alias` as its only argument when given. Replies arrive
    /// later as independent inbound messages.
    ///
    /// Returns the number of queries sent: one per mapping, without
    /// deduplicating mappings that share a destination. An unmapped signal
    /// yields 0.
    pub fn send_query(&self, source: &LocalSignal, alias: Option<&str>) -> usize {
        let Some(entry) = self.entry(source.id) else {
            return 0;
        };
        let Some(endpoint) = self.endpoint() else {
            debug!(router = %self.dest_name(), "Query skipped, no endpoint");
            return 0;
        };

        let mut count = 0;
        for mapping in entry.mappings() {
            let mut message = OutboundMessage::new(mapping.dest_name.with_suffix(QUERY_SUFFIX));
            if let Some(alias) = alias {
                message.args.push(MessageArg::Str(alias.to_string()));
            }

            match self
                .transport()
                .transmit_query(endpoint, self.device(), &message)
            {
                Ok(()) => {
                    self.metrics().inc_queries_sent();
                    observability::metrics::record_query_sent(self.dest_name().shared());
                }
                Err(e) => {
                    self.metrics().inc_transport_failures();
                    observability::metrics::record_transport_failure(self.dest_name().shared());
                    warn!(router = %self.dest_name(), error = %e, "Query send failed");
                }
            }
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use contracts::{ElementType, Endpoint, LocalDevice, MappingId, SignalId};

    use super::*;
    use crate::transport::{MemoryTransport, SentKind};

    fn setup() -> (DestinationRouter, Arc<MemoryTransport>, LocalSignal) {
        let transport = Arc::new(MemoryTransport::new());
        let router = DestinationRouter::new(
            "/dest",
            Endpoint {
                host: "localhost".to_string(),
                port: 9000,
                addr: "127.0.0.1:9000".parse().unwrap(),
            },
            transport.clone(),
            Arc::new(LocalDevice::new("query_device")),
        );
        let signal = LocalSignal::new(SignalId(1), "/S", ElementType::Float32, 1);
        (router, transport, signal)
    }

    #[test]
    fn test_query_with_alias() {
        let (mut router, transport, s) = setup();
        router
            .add_mapping(MappingId(1), &s, "/dest/x", ElementType::Float32, 1)
            .unwrap();

        let count = router.send_query(&s, Some("tag42"));

        assert_eq!(count, 1);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, SentKind::Query);
        assert_eq!(sent[0].message.address, "/dest/x/get");
        assert_eq!(sent[0].message.args, vec![MessageArg::Str("tag42".into())]);
        assert_eq!(sent[0].reply_source.as_deref(), Some("query_device"));
    }

    #[test]
    fn test_query_without_alias_has_no_args() {
        let (mut router, transport, s) = setup();
        router
            .add_mapping(MappingId(1), &s, "/dest/x", ElementType::Float32, 1)
            .unwrap();

        router.send_query(&s, None);

        assert!(transport.sent()[0].message.args.is_empty());
    }

    #[test]
    fn test_query_unmapped_signal_returns_zero() {
        let (router, transport, s) = setup();
        assert_eq!(router.send_query(&s, Some("x")), 0);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_query_no_dedup() {
        let (mut router, transport, s) = setup();
        router
            .add_mapping(MappingId(1), &s, "/dest/x", ElementType::Float32, 1)
            .unwrap();
        router
            .add_mapping(MappingId(2), &s, "/dest/x", ElementType::Float32, 1)
            .unwrap();

        assert_eq!(router.send_query(&s, None), 2);
        assert_eq!(transport.len(), 2);
        assert_eq!(router.metrics().queries_sent(), 2);
    }

    #[test]
    fn test_query_counts_failed_sends() {
        let (mut router, transport, s) = setup();
        router
            .add_mapping(MappingId(1), &s, "/dest/x", ElementType::Float32, 1)
            .unwrap();
        transport.set_failing(true);

        assert_eq!(router.send_query(&s, None), 1);
        assert_eq!(router.metrics().transport_failures(), 1);
    }
}
