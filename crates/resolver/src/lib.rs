//! Hostname resolution for ESP32 devices.
//!
//! Link-local names (`esp32.local`) are resolved once to an IPv4 literal
//! and cached for [`RESOLVE_TTL`](esplink_protocol::RESOLVE_TTL), so later
//! connections skip the slow multicast lookup. Any other name is handed
//! back untouched.

pub mod cache;
pub mod lookup;
pub mod resolver;

pub use cache::{Clock, ResolutionCache, SystemClock};
pub use lookup::{Lookup, SystemLookup};
pub use resolver::Resolver;

/// Errors for resolution operations.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("lookup of {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no IPv4 address found for {0}")]
    NoAddress(String),

    #[error("lookup of {0} timed out")]
    Timeout(String),
}
