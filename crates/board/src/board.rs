//! Single-device convenience wrapper around the connection manager.

use std::time::Duration;

use esplink_protocol::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, Endpoint};
use tracing::warn;

use crate::connector::{Connector, TcpConnector};
use crate::error::BoardError;
use crate::manager::ConnectionManager;
use crate::session::Session;
use crate::types::RetryPolicy;

/// Where and how patiently to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardOptions {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// A board that holds at most one session at a time.
pub struct Board<C = TcpConnector> {
    options: BoardOptions,
    manager: ConnectionManager<C>,
    session: Option<Session>,
}

impl Board<TcpConnector> {
    pub fn new(options: BoardOptions) -> Self {
        Self::with_manager(options, ConnectionManager::new())
    }
}

impl<C: Connector> Board<C> {
    pub fn with_manager(options: BoardOptions, manager: ConnectionManager<C>) -> Self {
        Self {
            options,
            manager,
            session: None,
        }
    }

    pub fn options(&self) -> &BoardOptions {
        &self.options
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.options.host.clone(), self.options.port)
    }

    /// Connects unless a ready session already exists.
    pub async fn connect(&mut self) -> Result<&Session, BoardError> {
        if !self.session.as_ref().is_some_and(Session::is_ready) {
            let session = self
                .manager
                .connect(&self.endpoint(), self.options.timeout)
                .await?;
            self.session = Some(session);
        }
        self.session.as_ref().ok_or(BoardError::Closed)
    }

    /// Like [`connect`](Self::connect), retrying per `policy`.
    pub async fn connect_with_retry(&mut self, policy: &RetryPolicy) -> Result<&Session, BoardError> {
        if !self.session.as_ref().is_some_and(Session::is_ready) {
            let session = self
                .manager
                .connect_with_retry(&self.endpoint(), self.options.timeout, policy)
                .await?;
            self.session = Some(session);
        }
        self.session.as_ref().ok_or(BoardError::Closed)
    }

    /// Connects if needed and writes `probe`. Reports failure as `false`.
    pub async fn test(&mut self, probe: &[u8]) -> bool {
        let result = match self.connect().await {
            Ok(session) => session.send(probe.to_vec()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint(), error = %e, "board test failed");
                false
            }
        }
    }

    /// The current session, if one was established.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Closes and forgets the session once its queued writes are flushed.
    /// No-op if there is none.
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

/// One-shot helper: a single attempt over TCP.
pub async fn connect_to_board(endpoint: &Endpoint, timeout: Duration) -> Result<Session, BoardError> {
    ConnectionManager::new().connect(endpoint, timeout).await
}
