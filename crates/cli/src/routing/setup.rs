//! Builds a running routing service from a blueprint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::{LocalDevice, RoutingBlueprint};
use router::{DnsResolver, RouterHandle, RouterRegistry, RouterService, RouterStatsSnapshot, UdpTransport};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::SignalTable;
use crate::error::CliError;

/// A running routing service and the local signals feeding it
pub struct RoutingContext {
    pub handle: RouterHandle,
    pub service: JoinHandle<Vec<RouterStatsSnapshot>>,
    pub signals: SignalTable,
    pub local_addr: SocketAddr,
    pub router_count: usize,
    pub mapping_count: usize,
}

impl RoutingContext {
    /// Drop the handle and wait for the service to finish.
    ///
    /// Returns each router's final statistics.
    pub async fn shutdown(self) -> Result<Vec<RouterStatsSnapshot>> {
        drop(self.handle);
        self.service
            .await
            .context("Routing service task panicked")
    }
}

/// Bind the device socket, create one router per destination and install
/// every configured mapping.
#[instrument(name = "routing_setup", skip(blueprint), fields(device = %blueprint.device.name))]
pub async fn build(blueprint: &RoutingBlueprint) -> Result<RoutingContext> {
    let device_cfg = &blueprint.device;

    let transport = UdpTransport::bind((device_cfg.bind_host.as_str(), device_cfg.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind device socket on {}:{}",
                device_cfg.bind_host, device_cfg.port
            )
        })?;
    let local_addr = transport.local_addr();
    let device = LocalDevice::new(device_cfg.name.clone()).with_reply_addr(local_addr);

    let registry = RouterRegistry::new(DnsResolver, Arc::new(transport), device);
    let (service, handle) = RouterService::new(registry, device_cfg.queue_capacity);
    let service = service.spawn();

    let signals = SignalTable::from_blueprint(blueprint);
    if signals.is_empty() {
        warn!("No signals configured");
    }

    for dest in &blueprint.destinations {
        let id = handle
            .create_router(dest.host.clone(), dest.port, dest.name.to_string())
            .await
            .with_context(|| format!("Failed to create router for {}", dest.name))?;
        debug!(router = %id, dest = %dest.name, "Router ready");
    }

    let mut mapping_count = 0;
    for mapping in &blueprint.mappings {
        let source = signals.get(&mapping.source)?.clone();
        let router = handle
            .find_router(mapping.destination.to_string())
            .await?
            .ok_or_else(|| CliError::missing_router(mapping.destination.to_string()))?;

        let id = handle
            .add_mapping(
                router,
                source,
                mapping.destination.to_string(),
                mapping.element_type,
                mapping.length,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to map {} -> {}",
                    mapping.source, mapping.destination
                )
            })?;

        let update = mapping.update();
        if !update.is_empty() {
            handle.update_mapping(router, id, update).await?;
        }
        mapping_count += 1;
    }

    info!(
        local_addr = %local_addr,
        signals = signals.len(),
        routers = blueprint.destinations.len(),
        mappings = mapping_count,
        "Routing table ready"
    );

    Ok(RoutingContext {
        handle,
        service,
        signals,
        local_addr,
        router_count: blueprint.destinations.len(),
        mapping_count,
    })
}
