//! Shared types and defaults for talking to an ESP32 over the local network.
//!
//! Both access paths (the streaming pin-control session and the HTTP
//! action interface) agree on the types in this crate.

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{Endpoint, ResolvedAddress, is_local_hostname};
