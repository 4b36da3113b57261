//! The send side of an upgraded connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{Instrument, debug, info_span};

use crate::connection::frame_sender::FrameSender;
use crate::connection::frame_writer::FrameWriter;
use crate::connection::{BufferPool, ConfigError, SessionConfig, SessionId};
use crate::protocol::{OpCode, SendError};

/// Handle to one upgraded connection.
///
/// [`WebSocketSession::send_frame`] may be called from any thread or task. Messages are
/// fragmented and queued under the session lock, so the frames of concurrent messages
/// never interleave on the wire. A dedicated writer task owns the socket's write half.
///
/// Closing is idempotent and may race from the read loop, the writer (on a write
/// failure) and the registry (on a broadcast failure).
#[derive(Debug)]
pub struct WebSocketSession {
    id: SessionId,
    sender: Mutex<FrameSender>,
    pool: Arc<BufferPool>,
    closing: AtomicBool,
    closed: CancellationToken,
}

impl WebSocketSession {
    /// Creates the session and spawns its writer task on the current runtime.
    ///
    /// Fails if `config` does not pass [`SessionConfig::validate`].
    pub fn spawn<W>(id: SessionId, writer: W, config: &SessionConfig) -> Result<(Arc<Self>, JoinHandle<()>), ConfigError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        config.validate()?;
        Ok(Self::start(id, writer, config))
    }

    /// [`WebSocketSession::spawn`] for a config that was validated already.
    pub(crate) fn start<W>(id: SessionId, writer: W, config: &SessionConfig) -> (Arc<Self>, JoinHandle<()>)
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pool = Arc::new(BufferPool::new(config.max_frame_size()));
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();

        let session = Arc::new(Self {
            id,
            sender: Mutex::new(FrameSender::new(config.max_frame_size(), Arc::clone(&pool), tx)),
            pool: Arc::clone(&pool),
            closing: AtomicBool::new(false),
            closed: closed.clone(),
        });

        let writer = FrameWriter::new(writer, rx, pool, config.write_timeout(), closed);
        let handle = tokio::spawn(writer.run().instrument(info_span!("writer", session = %id)));
        (session, handle)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queues `payload` as one message and returns the number of frames it took.
    pub fn send_frame(&self, opcode: OpCode, payload: &[u8]) -> Result<usize, SendError> {
        let mut sender = self.sender.lock();
        if self.closing.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        sender.send(opcode, payload)
    }

    /// Queues `text` as one text message.
    pub fn send_text(&self, text: &str) -> Result<usize, SendError> {
        self.send_frame(OpCode::Text, text.as_bytes())
    }

    /// Queues `payload` as one binary message.
    pub fn send_binary(&self, payload: &[u8]) -> Result<usize, SendError> {
        self.send_frame(OpCode::Binary, payload)
    }

    /// Stops accepting messages, lets the writer finish what is queued and signals
    /// [`WebSocketSession::closed`].
    pub fn close(&self) {
        let mut sender = self.sender.lock();
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }

        sender.shutdown();
        self.closed.cancel();
        debug!(session = %self.id, "websocket session closed");
    }

    /// True once the session was closed or its writer aborted.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Completes once the session was closed or its writer aborted.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// The pool the frames of this session are encoded into.
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_util::{CaptureWriter, FailingWriter, parse_server_frames};

    fn config(max_frame_size: usize) -> SessionConfig {
        SessionConfig::default().with_max_frame_size(max_frame_size)
    }

    #[tokio::test]
    async fn sends_and_closes() {
        let capture = CaptureWriter::default();
        let (session, writer) = WebSocketSession::spawn(SessionId::new(1), capture.clone(), &config(512)).unwrap();

        assert_eq!(session.send_text("hello").unwrap(), 1);
        session.close();
        session.close();
        writer.await.unwrap();

        assert_eq!(capture.bytes(), b"\x81\x05hello");
        assert!(capture.is_shutdown());
        assert!(session.is_closed());
        assert!(matches!(session.send_text("late"), Err(SendError::Closed)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_messages_do_not_interleave() {
        const MESSAGES: usize = 50;
        const SIZE: usize = 1500;

        let capture = CaptureWriter::default();
        let (session, writer) = WebSocketSession::spawn(SessionId::new(7), capture.clone(), &config(256)).unwrap();

        let senders: Vec<_> = [b'a', b'b']
            .into_iter()
            .map(|byte| {
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for _ in 0..MESSAGES {
                        session.send_binary(&[byte; SIZE]).unwrap();
                    }
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }

        session.close();
        writer.await.unwrap();

        let frames = parse_server_frames(&capture.bytes());
        let mut messages = Vec::new();
        let mut current: Vec<u8> = Vec::new();
        for frame in frames {
            if current.is_empty() {
                assert_eq!(frame.opcode, OpCode::Binary);
            } else {
                assert_eq!(frame.opcode, OpCode::Continuation);
            }
            current.extend_from_slice(&frame.payload);
            if frame.fin {
                messages.push(std::mem::take(&mut current));
            }
        }

        assert!(current.is_empty());
        assert_eq!(messages.len(), 2 * MESSAGES);
        for message in messages {
            assert_eq!(message.len(), SIZE);
            assert!(message.iter().all(|&b| b == message[0]), "fragments of two messages interleaved");
        }
    }

    #[tokio::test]
    async fn spawn_rejects_invalid_config() {
        let result = WebSocketSession::spawn(SessionId::new(1), CaptureWriter::default(), &config(8));
        assert!(matches!(result, Err(ConfigError::FrameSizeTooSmall(8))));

        let zero_buffer = SessionConfig::default().with_read_buffer_size(0);
        let result = WebSocketSession::spawn(SessionId::new(2), CaptureWriter::default(), &zero_buffer);
        assert!(matches!(result, Err(ConfigError::ZeroReadBuffer)));
    }

    #[tokio::test]
    async fn write_failure_closes_session() {
        let (session, writer) = WebSocketSession::spawn(SessionId::new(3), FailingWriter, &config(64)).unwrap();

        session.send_text("doomed").unwrap();
        session.closed().await;
        writer.await.unwrap();

        assert!(session.is_closed());
        assert_eq!(session.buffer_pool().created(), 1);
        assert_eq!(session.buffer_pool().available(), 1);
        assert!(matches!(session.send_text("after abort"), Err(SendError::Closed)));

        session.close();
    }
}
