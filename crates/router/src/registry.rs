//! RouterRegistry - every destination router of a local device

use std::fmt;
use std::sync::Arc;

use slab::Slab;
use tracing::{debug, info, instrument};

use contracts::{
    ContractError, ElementType, EndpointResolver, LocalDevice, LocalSignal, Mapping, MappingId,
    MappingUpdate, SignalName, SignalVector, Transport,
};

use crate::dispatch::{DispatchPipeline, DispatchReport};
use crate::error::RouterError;
use crate::metrics::RouterStatsSnapshot;
use crate::router::DestinationRouter;

/// Key of a router in its registry.
///
/// Keys of destroyed routers are reused by later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterId(pub usize);

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "router#{}", self.0)
    }
}

/// Owns the destination routers of one local device.
///
/// Not internally synchronized: all calls must come from one writer, see
/// [`RouterService`](crate::RouterService).
pub struct RouterRegistry<R> {
    routers: Slab<DestinationRouter>,
    resolver: R,
    transport: Arc<dyn Transport>,
    device: Arc<LocalDevice>,
    pipeline: DispatchPipeline,
    next_mapping_id: u64,
}

impl<R: EndpointResolver> RouterRegistry<R> {
    pub fn new(resolver: R, transport: Arc<dyn Transport>, device: LocalDevice) -> Self {
        Self {
            routers: Slab::new(),
            resolver,
            transport,
            device: Arc::new(device),
            pipeline: DispatchPipeline::default(),
            next_mapping_id: 1,
        }
    }

    /// Replace the transform/clip evaluators used on dispatch
    pub fn with_pipeline(mut self, pipeline: DispatchPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn device(&self) -> &LocalDevice {
        &self.device
    }

    pub fn pipeline(&self) -> &DispatchPipeline {
        &self.pipeline
    }

    /// Resolve `host:port` and register a router for `dest_name`.
    ///
    /// # Errors
    /// `AddressResolution` if the endpoint cannot be resolved; nothing is
    /// registered in that case.
    #[instrument(name = "registry_create_router", skip(self), fields(dest = %dest_name))]
    pub async fn create_router(
        &mut self,
        host: &str,
        port: u16,
        dest_name: &str,
    ) -> Result<RouterId, RouterError> {
        let endpoint = self
            .resolver
            .resolve(host, port)
            .await
            .map_err(|e| resolution_error(host, port, dest_name, e))?;

        let router = DestinationRouter::new(
            dest_name,
            endpoint,
            Arc::clone(&self.transport),
            Arc::clone(&self.device),
        );
        let id = RouterId(self.routers.insert(router));
        observability::metrics::record_router_count(self.routers.len());

        info!(router = %id, dest = dest_name, host, port, "Router created");
        Ok(id)
    }

    /// Reuse the router addressing `dest_name`, or create one
    pub async fn find_or_create_router(
        &mut self,
        host: &str,
        port: u16,
        dest_name: &str,
    ) -> Result<RouterId, RouterError> {
        match self.find_router_by_destination_name(dest_name) {
            Some(id) => Ok(id),
            None => self.create_router(host, port, dest_name).await,
        }
    }
}

impl<R> RouterRegistry<R> {
    /// Router whose destination shares the first path segment of `name`.
    ///
    /// `/synth1/freq` and `/synth1/gain` both find the router created for
    /// `/synth1`.
    pub fn find_router_by_destination_name(&self, name: &str) -> Option<RouterId> {
        let key = SignalName::from(name).destination_key();
        self.routers
            .iter()
            .find(|(_, r)| *r.key() == key)
            .map(|(idx, _)| RouterId(idx))
    }

    /// Release the router's endpoint and every mapping it owns.
    pub fn destroy_router(&mut self, id: RouterId) -> Result<RouterStatsSnapshot, RouterError> {
        let mut router = self
            .routers
            .try_remove(id.0)
            .ok_or(RouterError::RouterNotFound(id))?;
        let stats = router.snapshot();
        router.close();
        observability::metrics::record_router_count(self.routers.len());

        info!(
            router = %id,
            dest = %router.dest_name(),
            mappings = stats.mapping_count,
            "Router destroyed"
        );
        Ok(stats)
    }

    pub fn router(&self, id: RouterId) -> Option<&DestinationRouter> {
        self.routers.get(id.0)
    }

    pub fn routers(&self) -> impl Iterator<Item = (RouterId, &DestinationRouter)> {
        self.routers.iter().map(|(idx, r)| (RouterId(idx), r))
    }

    pub fn len(&self) -> usize {
        self.routers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routers.is_empty()
    }

    /// Map `source` to `dest_name` through router `id`.
    ///
    /// # Errors
    /// `RouterNotFound`, or `LengthMismatch` with no state changed.
    pub fn add_mapping(
        &mut self,
        id: RouterId,
        source: &LocalSignal,
        dest_name: &str,
        dest_type: ElementType,
        dest_length: usize,
    ) -> Result<MappingId, RouterError> {
        let router = self
            .routers
            .get_mut(id.0)
            .ok_or(RouterError::RouterNotFound(id))?;

        let mapping_id = MappingId(self.next_mapping_id);
        router.add_mapping(mapping_id, source, dest_name, dest_type, dest_length)?;
        // Only consumed on success
        self.next_mapping_id += 1;
        Ok(mapping_id)
    }

    /// Remove `mapping` from router `id` only; other routers are not
    /// searched.
    pub fn remove_mapping(&mut self, id: RouterId, mapping: MappingId) -> Result<Mapping, RouterError> {
        self.routers
            .get_mut(id.0)
            .ok_or(RouterError::RouterNotFound(id))?
            .remove_mapping(mapping)
    }

    pub fn update_mapping(
        &mut self,
        id: RouterId,
        mapping: MappingId,
        update: MappingUpdate,
    ) -> Result<Mapping, RouterError> {
        self.routers
            .get_mut(id.0)
            .ok_or(RouterError::RouterNotFound(id))?
            .update_mapping(mapping, update)
            .cloned()
    }

    /// Dispatch a value change of `source` through router `id`
    pub fn dispatch_to(
        &self,
        id: RouterId,
        source: &LocalSignal,
        value: &SignalVector,
    ) -> Result<DispatchReport, RouterError> {
        let router = self.routers.get(id.0).ok_or(RouterError::RouterNotFound(id))?;
        Ok(self.pipeline.on_signal_value(router, source, value))
    }

    /// Dispatch a value change of `source` through every router
    pub fn on_signal_value(&self, source: &LocalSignal, value: &SignalVector) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (_, router) in self.routers.iter() {
            report.merge(self.pipeline.on_signal_value(router, source, value));
        }

        if report.sent > 0 || report.aborted > 0 {
            debug!(
                signal = %source.name,
                sent = report.sent,
                aborted = report.aborted,
                "Signal dispatched"
            );
        }
        report
    }

    /// Query every destination `source` is mapped to, on every router
    pub fn send_query(&self, source: &LocalSignal, alias: Option<&str>) -> usize {
        self.routers
            .iter()
            .map(|(_, router)| router.send_query(source, alias))
            .sum()
    }

    pub fn stats(&self) -> Vec<RouterStatsSnapshot> {
        self.routers.iter().map(|(_, r)| r.snapshot()).collect()
    }
}

fn resolution_error(host: &str, port: u16, dest_name: &str, e: ContractError) -> RouterError {
    let message = match e {
        ContractError::AddressResolution { message, .. } => message,
        other => other.to_string(),
    };
    RouterError::AddressResolution {
        host: host.to_string(),
        port,
        dest_name: dest_name.to_string(),
        message,
    }
}
