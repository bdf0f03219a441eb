//! Public types for the session layer.

use std::time::Duration;

use esplink_protocol::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, Endpoint};
use uuid::Uuid;

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Dial in progress.
    Connecting,
    /// Transport is up; pin traffic may flow.
    Ready,
    /// Dial failed or timed out.
    Failed,
    /// Closed locally or by the device. Terminal.
    Closed,
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A dial started, succeeded or failed.
    StateChanged {
        endpoint: Endpoint,
        state: SessionState,
    },
    /// A connection attempt under the retry orchestrator failed.
    AttemptFailed {
        endpoint: Endpoint,
        attempt: u32,
        retries: u32,
        reason: String,
        /// `None` when this was the last attempt.
        retry_in: Option<Duration>,
    },
    /// A ready session went away.
    Disconnected {
        endpoint: Endpoint,
        session_id: Uuid,
        /// `true` when the device closed the stream.
        remote: bool,
    },
}

/// Fixed-delay retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts. `0` behaves like `1`.
    pub retries: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            retries,
            retry_delay,
        }
    }

    /// Attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }

    /// Upper bound on time spent before giving up.
    pub fn worst_case(&self, connect_timeout: Duration) -> Duration {
        let n = self.attempts();
        connect_timeout * n + self.retry_delay * (n - 1)
    }
}
