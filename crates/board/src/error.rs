//! Error types for the streaming session.

use std::time::Duration;

/// Errors from establishing or using a session.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// The transport did not become ready before the connect timeout.
    #[error("connection timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// The transport reported an error while connecting.
    #[error("board connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("session closed")]
    Closed,
}
