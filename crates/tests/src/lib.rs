//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract smoke tests
//! - Routing over loopback UDP with a decoding receiver
//! - Config blueprint to running service

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::IDENTITY_EXPRESSION, "y=x");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        ClipPolicy, ElementType, LocalDevice, LocalSignal, MappingUpdate, MessageArg,
        OutboundMessage, SignalId, SignalVector,
    };
    use router::transport::osc;
    use router::{
        DnsResolver, RouterHandle, RouterRegistry, RouterService, RouterStatsSnapshot,
        UdpTransport,
    };
    use tokio::net::UdpSocket;
    use tokio::task::JoinHandle;

    /// Remote peer stand-in: a bound socket that decodes what it receives
    struct Receiver {
        socket: UdpSocket,
    }

    impl Receiver {
        async fn bind() -> Self {
            Self {
                socket: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            }
        }

        fn port(&self) -> u16 {
            self.socket.local_addr().unwrap().port()
        }

        async fn recv(&self) -> Option<(OutboundMessage, SocketAddr)> {
            let mut buf = vec![0u8; 2048];
            let (len, from) =
                tokio::time::timeout(Duration::from_millis(500), self.socket.recv_from(&mut buf))
                    .await
                    .ok()?
                    .ok()?;
            Some((osc::decode(&buf[..len]).unwrap(), from))
        }
    }

    struct Device {
        handle: RouterHandle,
        task: JoinHandle<Vec<RouterStatsSnapshot>>,
        addr: SocketAddr,
    }

    async fn device(name: &str) -> Device {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr();
        let registry = RouterRegistry::new(
            DnsResolver,
            Arc::new(transport),
            LocalDevice::new(name).with_reply_addr(addr),
        );
        let (service, handle) = RouterService::new(registry, 64);
        Device {
            handle,
            task: service.spawn(),
            addr,
        }
    }

    fn freq() -> LocalSignal {
        LocalSignal::new(SignalId(1), "/S", ElementType::Float32, 2)
    }

    /// End-to-end: local value change -> router -> UDP -> decoded message
    #[tokio::test]
    async fn test_e2e_value_over_udp() {
        let peer = Receiver::bind().await;
        let dev = device("e2e_value").await;

        let router = dev
            .handle
            .create_router("localhost", peer.port(), "/dest")
            .await
            .unwrap();
        dev.handle
            .add_mapping(router, freq(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        let report = dev
            .handle
            .dispatch(freq(), SignalVector::from(vec![1.0f32, 2.0]))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);

        let (message, from) = peer.recv().await.expect("no message received");
        assert_eq!(message.address, "/dest/x");
        assert_eq!(
            message.args,
            vec![MessageArg::Float32(1.0), MessageArg::Float32(2.0)]
        );
        assert_eq!(from, dev.addr);

        drop(dev.handle);
        let stats = dev.task.await.unwrap();
        assert_eq!(stats[0].messages_sent, 1);
    }

    /// Query goes to `<dest>/get` from the device socket, carrying the alias
    #[tokio::test]
    async fn test_e2e_query_over_udp() {
        let peer = Receiver::bind().await;
        let dev = device("e2e_query").await;

        let router = dev
            .handle
            .create_router("127.0.0.1", peer.port(), "/dest")
            .await
            .unwrap();
        dev.handle
            .add_mapping(router, freq(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        let count = dev
            .handle
            .send_query(freq(), Some("tag42".to_string()))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (message, from) = peer.recv().await.expect("no query received");
        assert_eq!(message.address, "/dest/x/get");
        assert_eq!(message.args, vec![MessageArg::Str("tag42".to_string())]);
        assert_eq!(from, dev.addr);
    }

    /// A failing element discards the whole vector for that mapping
    #[tokio::test]
    async fn test_e2e_clip_failure_sends_nothing() {
        let peer = Receiver::bind().await;
        let dev = device("e2e_clip").await;

        let router = dev
            .handle
            .create_router("localhost", peer.port(), "/dest")
            .await
            .unwrap();
        let mapping = dev
            .handle
            .add_mapping(router, freq(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();
        // Finite values clip fine; NaN fails at element 1
        dev.handle
            .update_mapping(
                router,
                mapping,
                MappingUpdate {
                    clip_min: Some(ClipPolicy::Bound(0.0)),
                    clip_max: Some(ClipPolicy::Bound(10.0)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = dev
            .handle
            .dispatch(freq(), SignalVector::from(vec![1.0f32, f32::NAN]))
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.aborted, 1);
        assert!(peer.recv().await.is_none());

        // Next value within range is clamped and sent
        dev.handle
            .dispatch(freq(), SignalVector::from(vec![-1.0f32, 20.0]))
            .await
            .unwrap();
        let (message, _) = peer.recv().await.expect("no message received");
        assert_eq!(
            message.args,
            vec![MessageArg::Float32(0.0), MessageArg::Float32(10.0)]
        );
    }

    /// Muted mappings never emit; unmuting restores output
    #[tokio::test]
    async fn test_e2e_mute_and_unmute() {
        let peer = Receiver::bind().await;
        let dev = device("e2e_mute").await;

        let router = dev
            .handle
            .create_router("localhost", peer.port(), "/dest")
            .await
            .unwrap();
        let mapping = dev
            .handle
            .add_mapping(router, freq(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        let mute = |muted| MappingUpdate {
            muted: Some(muted),
            ..Default::default()
        };

        dev.handle.update_mapping(router, mapping, mute(true)).await.unwrap();
        dev.handle
            .dispatch(freq(), SignalVector::from(vec![1.0f32, 2.0]))
            .await
            .unwrap();
        assert!(peer.recv().await.is_none());

        dev.handle.update_mapping(router, mapping, mute(false)).await.unwrap();
        dev.handle
            .dispatch(freq(), SignalVector::from(vec![1.0f32, 2.0]))
            .await
            .unwrap();
        assert!(peer.recv().await.is_some());
    }

    /// `/synth1` and `/synth10` are different routers; each receives only
    /// its own mappings
    #[tokio::test]
    async fn test_e2e_fan_out_distinct_destinations() {
        let synth1 = Receiver::bind().await;
        let synth10 = Receiver::bind().await;
        let dev = device("e2e_fanout").await;

        let r1 = dev
            .handle
            .create_router("localhost", synth1.port(), "/synth1")
            .await
            .unwrap();
        let r10 = dev
            .handle
            .create_router("localhost", synth10.port(), "/synth10")
            .await
            .unwrap();
        assert_ne!(r1, r10);
        assert_eq!(dev.handle.find_router("/synth10/freq").await.unwrap(), Some(r10));

        dev.handle
            .add_mapping(r1, freq(), "/synth1/freq", ElementType::Float32, 2)
            .await
            .unwrap();
        dev.handle
            .add_mapping(r10, freq(), "/synth10/freq", ElementType::Int32, 2)
            .await
            .unwrap();

        let report = dev
            .handle
            .dispatch(freq(), SignalVector::from(vec![3.5f32, 4.0]))
            .await
            .unwrap();
        assert_eq!(report.sent, 2);

        let (m1, _) = synth1.recv().await.unwrap();
        assert_eq!(m1.address, "/synth1/freq");
        assert_eq!(m1.args[0], MessageArg::Float32(3.5));

        let (m10, _) = synth10.recv().await.unwrap();
        assert_eq!(m10.address, "/synth10/freq");
        assert_eq!(m10.args, vec![MessageArg::Int32(3), MessageArg::Int32(4)]);

        assert!(synth1.recv().await.is_none());
    }

    /// Removing the last mapping stops output for that signal
    #[tokio::test]
    async fn test_e2e_remove_mapping_stops_output() {
        let peer = Receiver::bind().await;
        let dev = device("e2e_remove").await;

        let router = dev
            .handle
            .create_router("localhost", peer.port(), "/dest")
            .await
            .unwrap();
        let mapping = dev
            .handle
            .add_mapping(router, freq(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        let removed = dev.handle.remove_mapping(router, mapping).await.unwrap();
        assert_eq!(removed.id, mapping);

        let report = dev
            .handle
            .dispatch(freq(), SignalVector::from(vec![1.0f32, 2.0]))
            .await
            .unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(dev.handle.send_query(freq(), None).await.unwrap(), 0);
        assert!(peer.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_e2e_unresolvable_host() {
        let dev = device("e2e_resolve").await;
        let err = dev
            .handle
            .create_router("no-such-host.invalid", 9000, "/dest")
            .await;
        assert!(matches!(err, Err(router::RouterError::AddressResolution { .. })));
        assert!(dev.handle.stats().await.unwrap().is_empty());
    }
}

#[cfg(test)]
mod config_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LocalDevice, LocalSignal, MessageArg, SignalId, SignalVector};
    use router::transport::osc;
    use router::{DnsResolver, RouterRegistry, RouterService, UdpTransport};
    use tokio::net::UdpSocket;

    /// Blueprint -> routers + mappings -> value on the wire
    #[tokio::test]
    async fn test_blueprint_to_running_service() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = peer.local_addr().unwrap().port();

        let config = format!(
            r#"
[device]
name = "synth_ctl"
bind_host = "127.0.0.1"

[[signals]]
name = "/freq"
type = "f"
length = 2

[[signals]]
name = "/level"
type = "i"
length = 1

[[destinations]]
name = "/synth1"
host = "localhost"
port = {port}

[[mappings]]
source = "/freq"
destination = "/synth1/freq"
type = "f"
length = 2
clip_max = {{ bound = 1000.0 }}

[[mappings]]
source = "/level"
destination = "/synth1/gain"
type = "f"
length = 1
muted = true
"#
        );
        let blueprint = ConfigLoader::load_from_str(&config, ConfigFormat::Toml).unwrap();

        let transport = UdpTransport::bind((blueprint.device.bind_host.as_str(), blueprint.device.port))
            .await
            .unwrap();
        let device = LocalDevice::new(blueprint.device.name.clone());
        let registry = RouterRegistry::new(DnsResolver, Arc::new(transport), device);
        let (service, handle) = RouterService::new(registry, blueprint.device.queue_capacity);
        let task = service.spawn();

        for dest in &blueprint.destinations {
            handle
                .create_router(dest.host.clone(), dest.port, dest.name.to_string())
                .await
                .unwrap();
        }

        let signals: Vec<LocalSignal> = blueprint
            .signals
            .iter()
            .enumerate()
            .map(|(i, s)| LocalSignal::new(SignalId(i as u32), s.name.clone(), s.element_type, s.length))
            .collect();

        for mapping in &blueprint.mappings {
            let source = signals.iter().find(|s| s.name == mapping.source).unwrap();
            let router = handle
                .find_router(mapping.destination.to_string())
                .await
                .unwrap()
                .unwrap();
            let id = handle
                .add_mapping(
                    router,
                    source.clone(),
                    mapping.destination.to_string(),
                    mapping.element_type,
                    mapping.length,
                )
                .await
                .unwrap();
            handle.update_mapping(router, id, mapping.update()).await.unwrap();
        }

        // Muted /level emits nothing
        let report = handle
            .dispatch(signals[1].clone(), SignalVector::from(vec![5i32]))
            .await
            .unwrap();
        assert_eq!(report.aborted, 1);

        let report = handle
            .dispatch(signals[0].clone(), SignalVector::from(vec![440.0f32, 2000.0]))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);

        let mut buf = [0u8; 1024];
        let (len, _) = tokio::time::timeout(Duration::from_millis(500), peer.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let message = osc::decode(&buf[..len]).unwrap();
        assert_eq!(message.address, "/synth1/freq");
        assert_eq!(
            message.args,
            vec![MessageArg::Float32(440.0), MessageArg::Float32(1000.0)]
        );

        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].mapping_count, 2);
        assert_eq!(stats[0].mappings_aborted, 1);
    }
}
