//! Transport client: one HTTP request, hard timeout, pooled connections.

use std::sync::Arc;
use std::time::Duration;

use esplink_protocol::{DEFAULT_REQUEST_TIMEOUT, HTTP_MAX_CONNECTIONS, HTTP_POOL_IDLE_TIMEOUT};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::types::{ActionRequest, ActionResult};

/// Shared HTTP client for the device.
///
/// Keeps connections alive between calls and never runs more than
/// `max_connections` requests at once. Cloning is cheap and shares the
/// pool and the concurrency limit.
#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    slots: Arc<Semaphore>,
    max_connections: usize,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a client with the default pool size and timeout.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_limits(HTTP_MAX_CONNECTIONS, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_limits(max_connections: usize, timeout: Duration) -> Result<Self, HttpError> {
        let max_connections = max_connections.max(1);
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(max_connections)
            .pool_idle_timeout(HTTP_POOL_IDLE_TIMEOUT)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            http,
            slots: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            timeout,
        })
    }

    /// Default timeout applied when a request does not carry its own.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Pool slots not currently held by an in-flight request.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Executes `req` and returns the raw status and body.
    ///
    /// The timeout covers waiting for a slot, sending, and reading the whole
    /// body. When it fires the request future is dropped, which aborts the
    /// connection and returns the slot.
    pub async fn request(&self, req: &ActionRequest) -> Result<ActionResult, HttpError> {
        let timeout = req.timeout.unwrap_or(self.timeout);
        match tokio::time::timeout(timeout, self.execute(req)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    method = ?req.method,
                    url = %req.url,
                    timeout_ms = timeout.as_millis() as u64,
                    "request timed out"
                );
                Err(HttpError::Timeout(timeout))
            }
        }
    }

    async fn execute(&self, req: &ActionRequest) -> Result<ActionResult, HttpError> {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| HttpError::InvalidRequest("client is shut down".into()))?;

        let mut builder = self.http.request(req.method.into(), &req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        debug!(method = ?req.method, url = %req.url, status, "request complete");
        Ok(ActionResult { status, body })
    }
}
