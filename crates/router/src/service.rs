//! RouterService - single writer for the routing table
//!
//! The registry is owned by one task. Every mutation, dispatch and query
//! is a command sent to that task, so mapping tables are never changed
//! while a dispatch is iterating them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    ElementType, EndpointResolver, LocalSignal, Mapping, MappingId, MappingUpdate, SignalVector,
};

use crate::dispatch::DispatchReport;
use crate::error::RouterError;
use crate::metrics::RouterStatsSnapshot;
use crate::registry::{RouterId, RouterRegistry};

type Reply<T> = oneshot::Sender<Result<T, RouterError>>;

enum Command {
    CreateRouter {
        host: String,
        port: u16,
        dest_name: String,
        reply: Reply<RouterId>,
    },
    DestroyRouter {
        id: RouterId,
        reply: Reply<RouterStatsSnapshot>,
    },
    FindRouter {
        name: String,
        reply: oneshot::Sender<Option<RouterId>>,
    },
    AddMapping {
        router: RouterId,
        source: LocalSignal,
        dest_name: String,
        dest_type: ElementType,
        dest_length: usize,
        reply: Reply<MappingId>,
    },
    RemoveMapping {
        router: RouterId,
        mapping: MappingId,
        reply: Reply<Mapping>,
    },
    UpdateMapping {
        router: RouterId,
        mapping: MappingId,
        update: MappingUpdate,
        reply: Reply<Mapping>,
    },
    SignalValue {
        source: LocalSignal,
        value: SignalVector,
        reply: Option<oneshot::Sender<DispatchReport>>,
    },
    Query {
        source: LocalSignal,
        alias: Option<String>,
        reply: oneshot::Sender<usize>,
    },
    Stats {
        reply: oneshot::Sender<Vec<RouterStatsSnapshot>>,
    },
}

/// Cloneable handle to a running [`RouterService`]
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Command>,
    dropped: Arc<AtomicU64>,
}

impl RouterHandle {
    /// See [`RouterRegistry::create_router`]
    pub async fn create_router(
        &self,
        host: impl Into<String>,
        port: u16,
        dest_name: impl Into<String>,
    ) -> Result<RouterId, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CreateRouter {
            host: host.into(),
            port,
            dest_name: dest_name.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)?
    }

    pub async fn destroy_router(&self, id: RouterId) -> Result<RouterStatsSnapshot, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::DestroyRouter { id, reply }).await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)?
    }

    pub async fn find_router(&self, name: impl Into<String>) -> Result<Option<RouterId>, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::FindRouter {
            name: name.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)
    }

    pub async fn add_mapping(
        &self,
        router: RouterId,
        source: LocalSignal,
        dest_name: impl Into<String>,
        dest_type: ElementType,
        dest_length: usize,
    ) -> Result<MappingId, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AddMapping {
            router,
            source,
            dest_name: dest_name.into(),
            dest_type,
            dest_length,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)?
    }

    pub async fn remove_mapping(
        &self,
        router: RouterId,
        mapping: MappingId,
    ) -> Result<Mapping, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::RemoveMapping {
            router,
            mapping,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)?
    }

    pub async fn update_mapping(
        &self,
        router: RouterId,
        mapping: MappingId,
        update: MappingUpdate,
    ) -> Result<Mapping, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateMapping {
            router,
            mapping,
            update,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)?
    }

    /// Report a local value change (non-blocking).
    ///
    /// Returns false if the value was dropped because the queue is full
    /// or the service has stopped.
    pub fn signal_value(&self, source: LocalSignal, value: SignalVector) -> bool {
        let command = Command::SignalValue {
            source,
            value,
            reply: None,
        };
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                observability::metrics::record_value_dropped();
                warn!("Routing queue full, value dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Routing service closed unexpectedly");
                false
            }
        }
    }

    /// Report a local value change and wait until it has been dispatched
    pub async fn dispatch(
        &self,
        source: LocalSignal,
        value: SignalVector,
    ) -> Result<DispatchReport, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SignalValue {
            source,
            value,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)
    }

    /// See [`RouterRegistry::send_query`]
    pub async fn send_query(
        &self,
        source: LocalSignal,
        alias: Option<String>,
    ) -> Result<usize, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Query {
            source,
            alias,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)
    }

    pub async fn stats(&self) -> Result<Vec<RouterStatsSnapshot>, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| RouterError::ServiceClosed)
    }

    /// Values dropped because the queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    async fn send(&self, command: Command) -> Result<(), RouterError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| RouterError::ServiceClosed)
    }
}

/// Task that owns a [`RouterRegistry`] and serves [`RouterHandle`]s.
pub struct RouterService<R> {
    registry: RouterRegistry<R>,
    rx: mpsc::Receiver<Command>,
}

impl<R> RouterService<R>
where
    R: EndpointResolver + Send + Sync + 'static,
{
    /// Create the service and its first handle
    pub fn new(registry: RouterRegistry<R>, queue_capacity: usize) -> (Self, RouterHandle) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let handle = RouterHandle {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (Self { registry, rx }, handle)
    }

    /// Spawn the service as a background task.
    ///
    /// The task ends when every handle is dropped and returns the final
    /// statistics of each router.
    pub fn spawn(self) -> JoinHandle<Vec<RouterStatsSnapshot>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run the service loop
    #[instrument(name = "router_service_run", skip(self), fields(device = %self.registry.device().name))]
    pub async fn run(mut self) -> Vec<RouterStatsSnapshot> {
        info!(routers = self.registry.len(), "Routing service started");

        let mut values: u64 = 0;
        while let Some(command) = self.rx.recv().await {
            if matches!(command, Command::SignalValue { .. }) {
                values += 1;
                if values % 1000 == 0 {
                    debug!(values, "Routing progress");
                }
            }
            self.handle(command).await;
        }

        info!(values, "All handles dropped, shutting down");
        self.teardown()
    }

    async fn handle(&mut self, command: Command) {
        let registry = &mut self.registry;
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::CreateRouter {
                host,
                port,
                dest_name,
                reply,
            } => {
                let result = registry.create_router(&host, port, &dest_name).await;
                let _ = reply.send(result);
            }
            Command::DestroyRouter { id, reply } => {
                let _ = reply.send(registry.destroy_router(id));
            }
            Command::FindRouter { name, reply } => {
                let _ = reply.send(registry.find_router_by_destination_name(&name));
            }
            Command::AddMapping {
                router,
                source,
                dest_name,
                dest_type,
                dest_length,
                reply,
            } => {
                let result = registry.add_mapping(router, &source, &dest_name, dest_type, dest_length);
                let _ = reply.send(result);
            }
            Command::RemoveMapping {
                router,
                mapping,
                reply,
            } => {
                let _ = reply.send(registry.remove_mapping(router, mapping));
            }
            Command::UpdateMapping {
                router,
                mapping,
                update,
                reply,
            } => {
                let _ = reply.send(registry.update_mapping(router, mapping, update));
            }
            Command::SignalValue {
                source,
                value,
                reply,
            } => {
                let report = registry.on_signal_value(&source, &value);
                if let Some(reply) = reply {
                    let _ = reply.send(report);
                }
            }
            Command::Query {
                source,
                alias,
                reply,
            } => {
                let _ = reply.send(registry.send_query(&source, alias.as_deref()));
            }
            Command::Stats { reply } => {
                let _ = reply.send(registry.stats());
            }
        }
    }

    fn teardown(mut self) -> Vec<RouterStatsSnapshot> {
        let ids: Vec<RouterId> = self.registry.routers().map(|(id, _)| id).collect();
        ids.into_iter()
            .filter_map(|id| self.registry.destroy_router(id).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, StaticResolver};
    use contracts::{LocalDevice, SignalId};

    fn service() -> (RouterService<StaticResolver>, RouterHandle, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let registry = RouterRegistry::new(
            StaticResolver::new(),
            transport.clone(),
            LocalDevice::new("service_test"),
        );
        let (service, handle) = RouterService::new(registry, 16);
        (service, handle, transport)
    }

    fn signal() -> LocalSignal {
        LocalSignal::new(SignalId(1), "/S", ElementType::Float32, 2)
    }

    #[tokio::test]
    async fn test_service_dispatch_roundtrip() {
        let (service, handle, transport) = service();
        let task = service.spawn();

        let router = handle.create_router("localhost", 9000, "/dest").await.unwrap();
        handle
            .add_mapping(router, signal(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        let report = handle
            .dispatch(signal(), SignalVector::from(vec![1.0f32, 2.0]))
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(transport.len(), 1);

        drop(handle);
        let stats = task.await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].messages_sent, 1);
    }

    #[tokio::test]
    async fn test_service_errors_are_returned() {
        let (service, handle, _) = service();
        let task = service.spawn();

        let err = handle.create_router("nowhere", 9000, "/dest").await;
        assert!(matches!(err, Err(RouterError::AddressResolution { .. })));

        let router = handle.create_router("localhost", 9000, "/dest").await.unwrap();
        let err = handle
            .add_mapping(router, signal(), "/dest/x", ElementType::Float32, 3)
            .await;
        assert!(matches!(err, Err(RouterError::LengthMismatch { .. })));

        let err = handle.remove_mapping(router, MappingId(99)).await;
        assert!(matches!(err, Err(RouterError::MappingNotFound(_))));

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_service_fire_and_forget_values() {
        let (service, handle, transport) = service();
        let task = service.spawn();

        let router = handle.create_router("localhost", 9000, "/dest").await.unwrap();
        handle
            .add_mapping(router, signal(), "/dest/x", ElementType::Float32, 2)
            .await
            .unwrap();

        for i in 0..3 {
            assert!(handle.signal_value(signal(), SignalVector::from(vec![i as f32, 0.0])));
        }
        // Commands are served in order, so stats observe all three values
        let stats = handle.stats().await.unwrap();
        assert_eq!(stats[0].messages_sent, 3);
        assert_eq!(transport.len(), 3);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_service_query_and_find() {
        let (service, handle, transport) = service();
        let task = service.spawn();

        let router = handle.create_router("localhost", 9000, "/synth1").await.unwrap();
        assert_eq!(handle.find_router("/synth1/gain").await.unwrap(), Some(router));
        handle
            .add_mapping(router, signal(), "/synth1/freq", ElementType::Float32, 2)
            .await
            .unwrap();

        let count = handle
            .send_query(signal(), Some("tag42".to_string()))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(transport.sent()[0].message.address, "/synth1/freq/get");

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_full_queue_drops_and_counts() {
        let registry = RouterRegistry::new(
            StaticResolver::new(),
            Arc::new(MemoryTransport::new()),
            LocalDevice::new("service_test"),
        );
        // Not spawned: nothing drains the queue
        let (_service, handle) = RouterService::new(registry, 1);

        assert!(handle.signal_value(signal(), SignalVector::from(vec![1.0f32, 2.0])));
        assert!(!handle.signal_value(signal(), SignalVector::from(vec![3.0f32, 4.0])));
        assert_eq!(handle.dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let (service, handle, _) = service();
        drop(service);

        assert!(!handle.signal_value(signal(), SignalVector::from(vec![1.0f32, 2.0])));
        assert!(matches!(
            handle.stats().await,
            Err(RouterError::ServiceClosed)
        ));
    }
}
