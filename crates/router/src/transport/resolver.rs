//! Endpoint resolvers

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::{debug, instrument};

use contracts::{ContractError, Endpoint, EndpointResolver};

/// Resolves hosts through the system resolver (`tokio::net::lookup_host`).
///
/// IPv4 addresses are preferred when a host has both families.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl EndpointResolver for DnsResolver {
    #[instrument(name = "dns_resolve", skip(self))]
    async fn resolve(&self, host: &str, port: u16) -> Result<Endpoint, ContractError> {
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ContractError::address_resolution(host, port, e.to_string()))?
            .collect();

        let addr = addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| ContractError::address_resolution(host, port, "no addresses"))?;

        debug!(host, port, addr = %addr, "Resolved endpoint");

        Ok(Endpoint {
            host: host.to_string(),
            port,
            addr,
        })
    }
}

/// Resolves from a fixed host table; anything else fails.
///
/// IP literals always resolve. `localhost` is preloaded.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        let mut hosts = HashMap::new();
        hosts.insert("localhost".to_string(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        Self { hosts }
    }

    pub fn with_host(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.hosts.insert(host.into(), ip);
        self
    }

    fn lookup(&self, host: &str, port: u16) -> Result<Endpoint, ContractError> {
        let ip = host
            .parse::<IpAddr>()
            .ok()
            .or_else(|| self.hosts.get(host).copied())
            .ok_or_else(|| ContractError::address_resolution(host, port, "unknown host"))?;

        Ok(Endpoint {
            host: host.to_string(),
            port,
            addr: SocketAddr::new(ip, port),
        })
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointResolver for StaticResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Endpoint, ContractError> {
        self.lookup(host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dns_resolver_ip_literal() {
        let endpoint = DnsResolver.resolve("127.0.0.1", 9000).await.unwrap();
        assert_eq!(endpoint.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(endpoint.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_static_resolver_localhost() {
        let endpoint = StaticResolver::new().resolve("localhost", 9000).await.unwrap();
        assert_eq!(endpoint.addr.port(), 9000);
        assert!(endpoint.addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn test_static_resolver_unknown_host() {
        let result = StaticResolver::new().resolve("synth.example", 9000).await;
        assert!(matches!(
            result,
            Err(ContractError::AddressResolution { port: 9000, .. })
        ));
    }
}
