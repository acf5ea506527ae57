//! DNS resolver module.
//!
//! Provides interfaces and implementations for resolving a host to the one
//! address the router classifies.

use std::collections::HashMap;
use std::net::{IpAddr, ToSocketAddrs};

use crate::error::{ResolveErrorKind, RouteError, Result};
use crate::matcher::parse_ip_literal;

#[cfg(feature = "async")]
use async_trait::async_trait;

/// DNS resolver interface.
pub trait Resolver: Send + Sync {
    /// Resolve the hostname to a single address.
    ///
    /// Returns an error if the lookup fails or yields no address.
    fn resolve(&self, host: &str) -> Result<IpAddr>;
}

/// Async DNS resolver interface.
#[cfg(feature = "async")]
#[async_trait]
pub trait AsyncResolver: Send + Sync {
    /// Resolve the hostname to a single address asynchronously.
    ///
    /// Returns an error if the lookup fails or yields no address.
    async fn resolve(&self, host: &str) -> Result<IpAddr>;
}

/// System DNS resolver using the OS resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    /// Create a new system resolver.
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        let addrs = (host, 0u16).to_socket_addrs().map_err(|e| {
            RouteError::resolve(
                ResolveErrorKind::NotFound,
                format!("Failed to resolve {}: {}", host, e),
            )
        })?;

        first_address(host, &mut addrs.map(|a| a.ip()))
    }
}

#[cfg(feature = "async")]
#[async_trait]
impl AsyncResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        let addrs = tokio::net::lookup_host((host, 0u16)).await.map_err(|e| {
            RouteError::resolve(
                ResolveErrorKind::NotFound,
                format!("Failed to resolve {}: {}", host, e),
            )
        })?;

        first_address(host, &mut addrs.map(|a| a.ip()))
    }
}

/// Resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilResolver;

impl NilResolver {
    /// Create a new nil resolver.
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for NilResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        Err(RouteError::resolve(
            ResolveErrorKind::NoAddress,
            format!("No address for {}", host),
        ))
    }
}

#[cfg(feature = "async")]
#[async_trait]
impl AsyncResolver for NilResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        Resolver::resolve(self, host)
    }
}

/// Static resolver with predefined mappings.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    mappings: HashMap<String, IpAddr>,
}

impl StaticResolver {
    /// Create a new empty static resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping for a hostname.
    pub fn add(&mut self, host: impl Into<String>, ip: IpAddr) {
        self.mappings.insert(host.into().to_ascii_lowercase(), ip);
    }

    /// Add a mapping and return self for chaining.
    pub fn with_mapping(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.add(host, ip);
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Some(ip) = parse_ip_literal(host) {
            return Ok(ip);
        }

        self.mappings
            .get(&host.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| {
                RouteError::resolve(
                    ResolveErrorKind::NotFound,
                    format!("Host not found: {}", host),
                )
            })
    }
}

#[cfg(feature = "async")]
#[async_trait]
impl AsyncResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr> {
        // Reuse sync implementation since it's non-blocking
        Resolver::resolve(self, host)
    }
}

/// Pick the first address, preferring IPv4.
fn first_address(host: &str, ips: &mut dyn Iterator<Item = IpAddr>) -> Result<IpAddr> {
    let mut first_v6 = None;
    for ip in ips {
        match ip {
            IpAddr::V4(_) => return Ok(ip),
            IpAddr::V6(_) if first_v6.is_none() => first_v6 = Some(ip),
            IpAddr::V6(_) => {}
        }
    }
    first_v6.ok_or_else(|| {
        RouteError::resolve(
            ResolveErrorKind::NoAddress,
            format!("No address found for {}", host),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn test_system_resolver_ip() {
        let resolver = SystemResolver::new();

        let ip = Resolver::resolve(&resolver, "127.0.0.1").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let ip = Resolver::resolve(&resolver, "[::1]").unwrap();
        assert_eq!(ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_nil_resolver() {
        let err = Resolver::resolve(&NilResolver::new(), "example.com").unwrap_err();
        assert_eq!(err.resolve_kind(), Some(ResolveErrorKind::NoAddress));
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new()
            .with_mapping("example.com", IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        let ip = Resolver::resolve(&resolver, "example.com").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        let ip = Resolver::resolve(&resolver, "EXAMPLE.com").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        let err = Resolver::resolve(&resolver, "unknown.com").unwrap_err();
        assert_eq!(err.resolve_kind(), Some(ResolveErrorKind::NotFound));
    }

    #[test]
    fn test_static_resolver_ip_passthrough() {
        let resolver = StaticResolver::new();
        let ip = Resolver::resolve(&resolver, "192.168.1.1").unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn test_first_address_prefers_v4() {
        let v6: IpAddr = "2001:db8::1".parse().unwrap();
        let v4: IpAddr = "1.2.3.4".parse().unwrap();
        let got = first_address("h", &mut vec![v6, v4].into_iter()).unwrap();
        assert_eq!(got, v4);

        let got = first_address("h", &mut vec![v6].into_iter()).unwrap();
        assert_eq!(got, v6);

        let err = first_address("h", &mut Vec::<IpAddr>::new().into_iter()).unwrap_err();
        assert_eq!(err.resolve_kind(), Some(ResolveErrorKind::NoAddress));
    }
}

#[cfg(all(test, feature = "async"))]
mod async_tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[tokio::test]
    async fn test_async_system_resolver_ip() {
        let resolver = SystemResolver::new();

        let ip = AsyncResolver::resolve(&resolver, "127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let ip = AsyncResolver::resolve(&resolver, "::1").await.unwrap();
        assert_eq!(ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_async_nil_resolver() {
        let result = AsyncResolver::resolve(&NilResolver::new(), "example.com").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_async_static_resolver() {
        let resolver = StaticResolver::new()
            .with_mapping("example.com", IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        let ip = AsyncResolver::resolve(&resolver, "example.com").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)));

        let result = AsyncResolver::resolve(&resolver, "unknown.com").await;
        assert!(result.is_err());
    }
}
