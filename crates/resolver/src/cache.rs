//! Time-bounded cache of resolved addresses.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use esplink_protocol::ResolvedAddress;

/// Source of the current time. Injected so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hostname → [`ResolvedAddress`] map with a fixed time-to-live.
///
/// Expired entries are not evicted; they are replaced on the next
/// successful lookup for the same hostname.
pub struct ResolutionCache {
    entries: RwLock<HashMap<String, ResolvedAddress>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResolutionCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Returns the entry for `hostname` if it is younger than the TTL.
    pub fn get_fresh(&self, hostname: &str) -> Option<ResolvedAddress> {
        let now = self.clock.now();
        let entries = self.entries.read().ok()?;
        entries
            .get(hostname)
            .filter(|e| now.saturating_duration_since(e.resolved_at) < self.ttl)
            .cloned()
    }

    /// Stores `entry`, replacing whatever was cached for its hostname.
    pub fn insert(&self, entry: ResolvedAddress) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entry.hostname.clone(), entry);
        }
    }

    /// Drops the entry for `hostname`. Returns `true` if one existed.
    pub fn remove(&self, hostname: &str) -> bool {
        self.entries
            .write()
            .map(|mut e| e.remove(hostname).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
