//! Read pump: device → inbound queue.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use esplink_protocol::SESSION_READ_BUFFER;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::session::SessionLink;

/// Forwards everything the device sends to the inbound queue.
///
/// Until a consumer takes the queue, received bytes are discarded so the
/// stream keeps draining. Afterwards a full queue holds the pump back
/// instead of dropping data. EOF or a read error while the session is
/// ready closes it as a remote disconnect.
pub(crate) async fn read_pump<R>(
    mut read: R,
    inbound_tx: mpsc::Sender<Vec<u8>>,
    link: Arc<SessionLink>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; SESSION_READ_BUFFER];

    loop {
        let n = tokio::select! {
            _ = link.cancel.cancelled() => {
                // Cancelled from above (manager shutdown) rather than by close().
                link.close(false);
                break;
            }

            result = read.read(&mut buf) => match result {
                Ok(0) => {
                    debug!(session = %link.id, "device closed the stream");
                    link.close(true);
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(session = %link.id, error = %e, "read error");
                    link.close(true);
                    break;
                }
            },
        };

        trace!(session = %link.id, bytes = n, "received");
        if !link.inbound_taken.load(Ordering::Acquire) {
            continue;
        }

        tokio::select! {
            _ = link.cancel.cancelled() => {
                link.close(false);
                break;
            }
            // A dropped receiver just means nobody listens any more.
            _ = inbound_tx.send(buf[..n].to_vec()) => {}
        }
    }
}
