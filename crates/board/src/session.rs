//! A ready streaming session and its lifecycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use esplink_protocol::{Endpoint, SESSION_QUEUE_DEPTH};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::error::BoardError;
use crate::types::{ConnectionEvent, SessionState};

/// State shared between a [`Session`] and its pumps.
pub(crate) struct SessionLink {
    pub(crate) id: Uuid,
    pub(crate) endpoint: Endpoint,
    pub(crate) state: watch::Sender<SessionState>,
    pub(crate) events_tx: Option<mpsc::Sender<ConnectionEvent>>,
    pub(crate) cancel: CancellationToken,
    /// Set once the inbound receiver has been handed out.
    pub(crate) inbound_taken: AtomicBool,
}

impl SessionLink {
    /// Moves `Ready → Closed`. Only the first caller wins; it stops the
    /// pumps and reports the disconnect. Returns whether this call closed it.
    pub(crate) fn close(&self, remote: bool) -> bool {
        let closed = self.state.send_if_modified(|s| {
            if *s == SessionState::Ready {
                *s = SessionState::Closed;
                true
            } else {
                false
            }
        });
        if !closed {
            return false;
        }

        self.cancel.cancel();
        info!(endpoint = %self.endpoint, session = %self.id, remote, "board disconnected");
        if let Some(tx) = &self.events_tx {
            let _ = tx.try_send(ConnectionEvent::Disconnected {
                endpoint: self.endpoint.clone(),
                session_id: self.id,
                remote,
            });
        }
        true
    }
}

/// An established session to the device's streaming endpoint.
///
/// The pin protocol layer writes through [`send`](Self::send) and reads
/// from [`take_inbound`](Self::take_inbound). Once the state is
/// [`SessionState::Closed`] every further operation fails; the session
/// cannot be revived. Dropping the handle closes the transport.
///
/// Bytes received before [`take_inbound`](Self::take_inbound) is called are
/// discarded. After that the read pump waits for the consumer when the
/// inbound queue is full, so nothing is lost.
pub struct Session {
    link: Arc<SessionLink>,
    write_tx: mpsc::Sender<Vec<u8>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Vec<u8>>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Splits `stream` and starts the read and write pumps.
    pub(crate) fn spawn<S>(
        stream: S,
        endpoint: Endpoint,
        cancel: CancellationToken,
        events_tx: Option<mpsc::Sender<ConnectionEvent>>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (state, _) = watch::channel(SessionState::Ready);
        let link = Arc::new(SessionLink {
            id: Uuid::new_v4(),
            endpoint,
            state,
            events_tx,
            cancel,
            inbound_taken: AtomicBool::new(false),
        });

        let (read, write) = tokio::io::split(stream);
        let (write_tx, write_rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
        let (inbound_tx, inbound_rx) = mpsc::channel(SESSION_QUEUE_DEPTH);

        tokio::spawn(crate::pumps::read::read_pump(read, inbound_tx, link.clone()));
        let writer = tokio::spawn(crate::pumps::write::write_pump(write, write_rx, link.clone()));

        Self {
            link,
            write_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            writer: Mutex::new(Some(writer)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.link.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.link.endpoint
    }

    pub fn state(&self) -> SessionState {
        *self.link.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Subscribes to state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.link.state.subscribe()
    }

    /// Resolves once the session is closed, by either side.
    pub async fn closed(&self) {
        let mut rx = self.link.state.subscribe();
        let _ = rx.wait_for(|s| *s == SessionState::Closed).await;
    }

    /// Takes the stream of bytes received from the device. Can only be
    /// called once.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<Vec<u8>>> {
        let rx = self.inbound_rx.lock().ok()?.take()?;
        self.link.inbound_taken.store(true, Ordering::Release);
        Some(rx)
    }

    /// Queues `bytes` for the device.
    pub async fn send(&self, bytes: impl Into<Vec<u8>>) -> Result<(), BoardError> {
        if !self.is_ready() {
            return Err(BoardError::Closed);
        }
        self.write_tx
            .send(bytes.into())
            .await
            .map_err(|_| BoardError::Closed)
    }

    /// Starts closing the session. The write pump flushes queued writes in
    /// the background; use [`close`](Self::close) to wait for that. Calling
    /// this on a closed session does nothing.
    pub fn disconnect(&self) {
        self.link.close(false);
    }

    /// Closes the session and returns once every queued write has reached
    /// the transport and its write half is shut down.
    pub async fn close(&self) {
        self.link.close(false);
        let writer = self.writer.lock().ok().and_then(|mut w| w.take());
        if let Some(writer) = writer {
            let _ = writer.await;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.link.id)
            .field("endpoint", &self.link.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.link.close(false);
        self.link.cancel.cancel();
    }
}
