//! Address types shared by the resolver, the session layer and the HTTP client.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::constants::LOCAL_SUFFIXES;

/// Returns `true` if `hostname` is resolved through link-local discovery
/// (`.local` / `.local.` suffix).
pub fn is_local_hostname(hostname: &str) -> bool {
    LOCAL_SUFFIXES.iter().any(|s| hostname.ends_with(s))
}

/// Host and port of the device's streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Outcome of resolving a device hostname.
///
/// For local-segment names `address` is always a literal IPv4 address.
/// Entries are replaced, never mutated, when they expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// The name the caller asked for.
    pub hostname: String,
    /// What to dial.
    pub address: String,
    /// When the lookup completed.
    pub resolved_at: Instant,
    /// HTTP calls must carry `Host: <hostname>`.
    pub source_header_required: bool,
}

impl ResolvedAddress {
    /// An address that needs no resolution (literal or globally resolvable).
    pub fn passthrough(hostname: &str, now: Instant) -> Self {
        Self {
            hostname: hostname.to_string(),
            address: hostname.to_string(),
            resolved_at: now,
            source_header_required: false,
        }
    }

    /// Streaming endpoint for this address on `port`.
    pub fn endpoint(&self, port: u16) -> Endpoint {
        Endpoint::new(self.address.clone(), port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_suffix_detection() {
        assert!(is_local_hostname("esp32.local"));
        assert!(is_local_hostname("esp32.local."));
        assert!(!is_local_hostname("esp32.lan"));
        assert!(!is_local_hostname("192.0.2.5"));
        assert!(!is_local_hostname("localhost"));
    }

    #[test]
    fn endpoint_display() {
        assert_eq!(Endpoint::new("192.0.2.5", 3030).to_string(), "192.0.2.5:3030");
        assert_eq!(Endpoint::new("fe80::1", 3030).to_string(), "[fe80::1]:3030");
    }

    #[test]
    fn endpoint_serde() {
        let ep = Endpoint::new("esp32.local", 3030);
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, r#"{"host":"esp32.local","port":3030}"#);
        let back: Endpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ep);
    }

    #[test]
    fn passthrough_keeps_hostname() {
        let now = Instant::now();
        let r = ResolvedAddress::passthrough("192.0.2.5", now);
        assert_eq!(r.address, "192.0.2.5");
        assert!(!r.source_header_required);
        assert_eq!(r.endpoint(3030), Endpoint::new("192.0.2.5", 3030));
    }
}
