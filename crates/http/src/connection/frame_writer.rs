use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::BufferPool;
use crate::connection::frame_sender::Outbound;

/// Drains a session's writer queue onto the socket.
///
/// Buffers are written one at a time in queue order and go back to the pool after
/// each write, failed or not. A write error or timeout cancels `aborted` and stops the
/// writer; so does [`Outbound::Shutdown`], without cancelling.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: W,
    queue: mpsc::UnboundedReceiver<Outbound>,
    pool: Arc<BufferPool>,
    write_timeout: Option<Duration>,
    aborted: CancellationToken,
}

impl<W> FrameWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(
        writer: W,
        queue: mpsc::UnboundedReceiver<Outbound>,
        pool: Arc<BufferPool>,
        write_timeout: Option<Duration>,
        aborted: CancellationToken,
    ) -> Self {
        Self { writer, queue, pool, write_timeout, aborted }
    }

    pub async fn run(mut self) {
        while let Some(outbound) = self.queue.recv().await {
            let buffer = match outbound {
                Outbound::Frame(buffer) => buffer,
                Outbound::Shutdown => {
                    debug!("writer received shutdown");
                    break;
                }
            };

            let result = self.write(buffer.as_bytes()).await;
            self.pool.release(buffer);

            if let Err(e) = result {
                warn!(cause = %e, "websocket write failed, abort session");
                self.aborted.cancel();
                break;
            }
        }

        // no more frames are accepted once the writer is gone
        self.queue.close();
        if let Err(e) = self.writer.shutdown().await {
            debug!(cause = %e, "failed to shutdown socket writer");
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let write = write_flush(&mut self.writer, bytes);

        match self.write_timeout {
            Some(timeout) => tokio::time::timeout(timeout, write)
                .await
                .unwrap_or_else(|_elapsed| Err(io::Error::new(io::ErrorKind::TimedOut, "websocket write timed out"))),
            None => write.await,
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_util::{CaptureWriter, FailingWriter};

    fn frame(bytes: &[u8], pool: &BufferPool) -> Outbound {
        let mut buffer = pool.acquire();
        buffer.push_slice(bytes);
        Outbound::Frame(buffer)
    }

    #[tokio::test]
    async fn writes_in_queue_order_until_shutdown() {
        let pool = Arc::new(BufferPool::new(16));
        let (tx, rx) = mpsc::unbounded_channel();
        let capture = CaptureWriter::default();
        let token = CancellationToken::new();

        tx.send(frame(b"one", &pool)).unwrap();
        tx.send(frame(b"two", &pool)).unwrap();
        tx.send(Outbound::Shutdown).unwrap();
        tx.send(frame(b"never", &pool)).unwrap();

        FrameWriter::new(capture.clone(), rx, Arc::clone(&pool), None, token.clone()).run().await;

        assert_eq!(capture.bytes(), b"onetwo");
        assert!(capture.is_shutdown());
        assert!(!token.is_cancelled());
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn write_failure_aborts_and_returns_buffer() {
        let pool = Arc::new(BufferPool::new(16));
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        tx.send(frame(b"boom", &pool)).unwrap();
        FrameWriter::new(FailingWriter, rx, Arc::clone(&pool), None, token.clone()).run().await;

        assert!(token.is_cancelled());
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.available(), 1);
        assert!(tx.send(Outbound::Shutdown).is_err());
    }
}
