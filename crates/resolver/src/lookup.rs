//! Name-service lookups.

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};

use crate::ResolveError;

/// A single name-service query restricted to IPv4 results.
pub trait Lookup: Send + Sync {
    fn lookup_ipv4(&self, host: &str)
    -> impl Future<Output = Result<Ipv4Addr, ResolveError>> + Send;
}

/// Uses the operating system resolver (`getaddrinfo`), which handles
/// `.local` names through the platform's mDNS responder.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl Lookup for SystemLookup {
    async fn lookup_ipv4(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|source| ResolveError::Lookup {
                host: host.to_string(),
                source,
            })?;

        // First IPv4 in resolver order.
        addrs
            .map(|sa| sa.ip())
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| ResolveError::NoAddress(host.to_string()))
    }
}
