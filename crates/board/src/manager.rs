//! Connection manager: dials the device under a connect timeout.

use std::time::Duration;

use esplink_protocol::Endpoint;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connector::{Connector, TcpConnector};
use crate::error::BoardError;
use crate::session::Session;
use crate::types::{ConnectionEvent, SessionState};

/// Establishes streaming sessions to the device.
///
/// Every session it creates is cancelled together with the manager's
/// token, so cancelling it tears down pending dials, retry delays and
/// live sessions alike.
pub struct ConnectionManager<C = TcpConnector> {
    connector: C,
    events_tx: Option<mpsc::Sender<ConnectionEvent>>,
    cancel: CancellationToken,
}

impl ConnectionManager<TcpConnector> {
    /// Creates a manager that dials over TCP.
    pub fn new() -> Self {
        Self::with_connector(TcpConnector)
    }
}

impl Default for ConnectionManager<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            events_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Routes lifecycle events to `tx`. Events are dropped if it is full.
    pub fn with_events(mut self, tx: mpsc::Sender<ConnectionEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Uses `cancel` instead of a private token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub(crate) fn emit(&self, event: ConnectionEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.try_send(event);
        }
    }

    fn emit_state(&self, endpoint: &Endpoint, state: SessionState) {
        self.emit(ConnectionEvent::StateChanged {
            endpoint: endpoint.clone(),
            state,
        });
    }

    /// Opens a session to `endpoint`.
    ///
    /// The dial races the timeout and the cancellation token; whichever
    /// finishes first decides the outcome and the others are dropped on
    /// the spot, so a late timer can never fail a session that already
    /// connected. No retry happens here.
    pub async fn connect(
        &self,
        endpoint: &Endpoint,
        connect_timeout: Duration,
    ) -> Result<Session, BoardError> {
        self.emit_state(endpoint, SessionState::Connecting);
        info!(%endpoint, timeout_ms = connect_timeout.as_millis() as u64, "connecting to board");

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BoardError::Cancelled),
            result = tokio::time::timeout(connect_timeout, self.connector.connect(endpoint)) => {
                match result {
                    Ok(Ok(stream)) => Ok(stream),
                    Ok(Err(source)) => Err(BoardError::Connect {
                        endpoint: endpoint.to_string(),
                        source,
                    }),
                    Err(_) => Err(BoardError::ConnectTimeout(connect_timeout)),
                }
            }
        };

        match outcome {
            Ok(stream) => {
                let session = Session::spawn(
                    stream,
                    endpoint.clone(),
                    self.cancel.child_token(),
                    self.events_tx.clone(),
                );
                self.emit_state(endpoint, SessionState::Ready);
                info!(%endpoint, session = %session.id(), "board connected");
                Ok(session)
            }
            Err(e) => {
                self.emit_state(endpoint, SessionState::Failed);
                debug!(%endpoint, error = %e, "connect failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::connector::testing::{HangingConnector, ScriptedConnector};

    fn endpoint() -> Endpoint {
        Endpoint::new("192.0.2.5", 3030)
    }

    fn drain(rx: &mut mpsc::Receiver<ConnectionEvent>) -> Vec<SessionState> {
        let mut states = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if let ConnectionEvent::StateChanged { state, .. } = ev {
                states.push(state);
            }
        }
        states
    }

    #[tokio::test]
    async fn connect_success_is_ready() {
        let (tx, mut rx) = mpsc::channel(16);
        let mgr = ConnectionManager::with_connector(ScriptedConnector::succeed_on(Some(1)))
            .with_events(tx);

        let session = mgr.connect(&endpoint(), Duration::from_secs(1)).await.unwrap();

        assert!(session.is_ready());
        assert_eq!(session.endpoint(), &endpoint());
        assert_eq!(drain(&mut rx), vec![SessionState::Connecting, SessionState::Ready]);
    }

    #[tokio::test]
    async fn connect_error_wraps_transport_message() {
        let (tx, mut rx) = mpsc::channel(16);
        let mgr = ConnectionManager::with_connector(ScriptedConnector::always_failing())
            .with_events(tx);

        let err = mgr
            .connect(&endpoint(), Duration::from_secs(1))
            .await
            .err()
            .unwrap();

        match &err {
            BoardError::Connect { endpoint, source } => {
                assert_eq!(endpoint, "192.0.2.5:3030");
                assert_eq!(source.to_string(), "refused on attempt 1");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(drain(&mut rx), vec![SessionState::Connecting, SessionState::Failed]);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_times_out() {
        let mgr = ConnectionManager::with_connector(HangingConnector::default());
        let start = tokio::time::Instant::now();

        let err = mgr
            .connect(&endpoint(), Duration::from_millis(10_000))
            .await
            .err()
            .unwrap();

        assert!(matches!(err, BoardError::ConnectTimeout(d) if d == Duration::from_millis(10_000)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10_000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(10_005), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn timer_cannot_fire_after_success() {
        let (tx, mut rx) = mpsc::channel(16);
        let mgr = ConnectionManager::with_connector(ScriptedConnector::succeed_on(Some(1)))
            .with_events(tx);

        let session = mgr.connect(&endpoint(), Duration::from_millis(100)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(session.is_ready());
        assert_eq!(drain(&mut rx), vec![SessionState::Connecting, SessionState::Ready]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_pending_dial() {
        let mgr = ConnectionManager::with_connector(HangingConnector::default());
        let cancel = mgr.cancel_token().clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = mgr
            .connect(&endpoint(), Duration::from_secs(10))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BoardError::Cancelled));
    }

    #[tokio::test]
    async fn cancel_closes_live_sessions() {
        let connector = ScriptedConnector::succeed_on(Some(1));
        let mgr = ConnectionManager::with_connector(connector);
        let session = mgr.connect(&endpoint(), Duration::from_secs(1)).await.unwrap();

        mgr.cancel_token().cancel();
        tokio::time::timeout(Duration::from_secs(2), session.closed())
            .await
            .expect("session should close with its manager");
        assert!(matches!(session.send(vec![1]).await, Err(BoardError::Closed)));
    }

    #[tokio::test]
    async fn connect_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|(s, _)| s) });

        let session = ConnectionManager::new()
            .connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2))
            .await
            .unwrap();
        let _device = accept.await.unwrap().unwrap();

        assert!(session.is_ready());
        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn connect_over_tcp_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = ConnectionManager::new()
            .connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BoardError::Connect { .. }), "{err}");
    }
}
