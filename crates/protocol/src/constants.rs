use std::time::Duration;

/// Hostname used when none is configured.
pub const DEFAULT_HOST: &str = "esp32.local";

/// Default port of the device's streaming (Firmata) listener.
pub const DEFAULT_PORT: u16 = 3030;

/// Connect timeout for library callers.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Connect timeout used by the command-line client.
pub const CLI_CONNECT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Wall-clock bound for a single HTTP request, body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);

/// How long a resolved local-segment address stays valid.
pub const RESOLVE_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound for a single name-service lookup.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Maximum concurrent HTTP requests against the device.
///
/// The ESP32 HTTP stack only serves a handful of sockets at once.
pub const HTTP_MAX_CONNECTIONS: usize = 4;

/// How long an idle pooled HTTP connection is kept open.
pub const HTTP_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Total connection attempts made by the retry orchestrator.
pub const DEFAULT_RETRIES: u32 = 3;

/// Fixed pause between two connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2_000);

/// Suffixes that mark a hostname as resolved through link-local discovery.
pub const LOCAL_SUFFIXES: [&str; 2] = [".local", ".local."];

/// Capacity of the per-session outbound and inbound byte queues.
pub const SESSION_QUEUE_DEPTH: usize = 64;

/// Read buffer size for the streaming session.
pub const SESSION_READ_BUFFER: usize = 4 * 1024;
