//! Resolver with a time-bounded cache for link-local names.

use std::sync::Arc;
use std::time::Duration;

use esplink_protocol::{RESOLVE_TIMEOUT, RESOLVE_TTL, ResolvedAddress, is_local_hostname};
use tracing::{debug, info};

use crate::ResolveError;
use crate::cache::{Clock, ResolutionCache, SystemClock};
use crate::lookup::{Lookup, SystemLookup};

/// Resolves device hostnames, caching link-local results.
///
/// Concurrent misses for the same hostname each perform their own lookup;
/// the last one to finish wins the cache slot.
pub struct Resolver<L = SystemLookup> {
    lookup: L,
    cache: ResolutionCache,
    timeout: Duration,
}

impl Resolver<SystemLookup> {
    /// Creates a resolver backed by the OS resolver with default TTL.
    pub fn new() -> Self {
        Self::with_lookup(SystemLookup, RESOLVE_TTL, Arc::new(SystemClock))
    }
}

impl Default for Resolver<SystemLookup> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Lookup> Resolver<L> {
    pub fn with_lookup(lookup: L, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            lookup,
            cache: ResolutionCache::new(ttl, clock),
            timeout: RESOLVE_TIMEOUT,
        }
    }

    /// Sets the upper bound for a single lookup.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Resolves `hostname` to something directly dialable.
    ///
    /// Names without a `.local` suffix are returned as-is and never cached.
    pub async fn resolve(&self, hostname: &str) -> Result<ResolvedAddress, ResolveError> {
        if !is_local_hostname(hostname) {
            return Ok(ResolvedAddress::passthrough(hostname, self.cache.now()));
        }

        if let Some(hit) = self.cache.get_fresh(hostname) {
            debug!(host = %hostname, address = %hit.address, "resolve cache hit");
            return Ok(hit);
        }

        debug!(host = %hostname, "resolve cache miss, looking up");
        let ip = tokio::time::timeout(self.timeout, self.lookup.lookup_ipv4(hostname))
            .await
            .map_err(|_| ResolveError::Timeout(hostname.to_string()))??;

        let resolved = ResolvedAddress {
            hostname: hostname.to_string(),
            address: ip.to_string(),
            resolved_at: self.cache.now(),
            source_header_required: true,
        };
        self.cache.insert(resolved.clone());

        info!(host = %hostname, address = %resolved.address, "resolved");
        Ok(resolved)
    }

    /// Forgets the cached address for `hostname` so the next call looks it up again.
    pub fn invalidate(&self, hostname: &str) -> bool {
        let removed = self.cache.remove(hostname);
        if removed {
            debug!(host = %hostname, "resolve cache entry invalidated");
        }
        removed
    }

    /// Number of cached hostnames (fresh or stale).
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
