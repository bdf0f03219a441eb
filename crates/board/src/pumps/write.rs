//! Write pump: outbound queue → device.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::SessionLink;

/// Writes queued chunks in order. On cancellation the queue is drained
/// before the write half is shut down.
pub(crate) async fn write_pump<W>(
    mut write: W,
    mut write_rx: mpsc::Receiver<Vec<u8>>,
    link: Arc<SessionLink>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            msg = write_rx.recv() => {
                let Some(bytes) = msg else { break };
                if let Err(e) = write_chunk(&mut write, &bytes).await {
                    warn!(session = %link.id, error = %e, "write error");
                    link.close(true);
                    return;
                }
            }

            _ = link.cancel.cancelled() => {
                while let Ok(bytes) = write_rx.try_recv() {
                    if write_chunk(&mut write, &bytes).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }

    let _ = write.shutdown().await;
    debug!(session = %link.id, "write pump stopped");
}

async fn write_chunk<W: AsyncWrite + Unpin>(write: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    write.write_all(bytes).await?;
    write.flush().await
}
