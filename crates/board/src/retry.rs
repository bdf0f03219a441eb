//! Fixed-delay retry around [`ConnectionManager::connect`].

use std::time::Duration;

use esplink_protocol::Endpoint;
use tracing::{info, warn};

use crate::connector::Connector;
use crate::error::BoardError;
use crate::manager::ConnectionManager;
use crate::session::Session;
use crate::types::{ConnectionEvent, RetryPolicy};

impl<C: Connector> ConnectionManager<C> {
    /// Connects, retrying failed attempts after `policy.retry_delay`.
    ///
    /// Attempts run strictly one after another. The first success returns
    /// immediately; after the last failure its error is returned as-is.
    /// Each failure is logged and reported as
    /// [`ConnectionEvent::AttemptFailed`] before the delay starts.
    pub async fn connect_with_retry(
        &self,
        endpoint: &Endpoint,
        connect_timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<Session, BoardError> {
        self.connect_with_retry_to(
            |_| std::future::ready(endpoint.clone()),
            connect_timeout,
            policy,
        )
        .await
    }

    /// Like [`connect_with_retry`](Self::connect_with_retry), but asks
    /// `endpoint_for` where to dial before every attempt (1-based). Callers
    /// use it to refresh a cached address between attempts.
    pub async fn connect_with_retry_to<F, Fut>(
        &self,
        mut endpoint_for: F,
        connect_timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<Session, BoardError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Endpoint>,
    {
        let attempts = policy.attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let endpoint = &endpoint_for(attempt).await;
            let err = match self.connect(endpoint, connect_timeout).await {
                Ok(session) => {
                    if attempt > 1 {
                        info!(%endpoint, attempt, "connected after retry");
                    }
                    return Ok(session);
                }
                Err(BoardError::Cancelled) => return Err(BoardError::Cancelled),
                Err(e) => e,
            };

            let retry_in = (attempt < attempts).then_some(policy.retry_delay);
            warn!(
                %endpoint,
                attempt,
                retries = attempts,
                error = %err,
                "connection attempt {attempt}/{attempts} failed"
            );
            self.emit(ConnectionEvent::AttemptFailed {
                endpoint: endpoint.clone(),
                attempt,
                retries: attempts,
                reason: err.to_string(),
                retry_in,
            });

            let Some(delay) = retry_in else {
                return Err(err);
            };

            info!(delay_ms = delay.as_millis() as u64, "retrying");
            tokio::select! {
                biased;
                _ = self.cancel_token().cancelled() => return Err(BoardError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
