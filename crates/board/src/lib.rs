//! Streaming session to an ESP32 pin-control endpoint.
//!
//! [`ConnectionManager`] dials the device under a connect timeout and hands
//! back a [`Session`] whose byte stream belongs to the pin protocol layer.
//! [`ConnectionManager::connect_with_retry`] wraps that in a fixed-delay
//! retry loop, and [`Board`] keeps one session around for simple callers.

pub mod board;
pub mod connector;
pub mod error;
pub mod manager;
mod pumps;
pub mod retry;
pub mod session;
pub mod types;

pub use board::{Board, BoardOptions, connect_to_board};
pub use connector::{Connector, TcpConnector};
pub use error::BoardError;
pub use manager::ConnectionManager;
pub use session::Session;
pub use types::{ConnectionEvent, RetryPolicy, SessionState};
