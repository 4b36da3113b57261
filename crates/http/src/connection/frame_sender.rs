//! Turns one outbound message into a sequence of frames on the writer queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::codec::{FrameHeader, encode_frame, header_len, max_fragment_payload};
use crate::connection::BufferPool;
use crate::protocol::{ByteBuffer, OpCode, SendError};

/// An entry of a session's writer queue.
#[derive(Debug)]
pub enum Outbound {
    Frame(ByteBuffer),
    /// Stops the writer once everything queued before it is written.
    Shutdown,
}

/// Fragments payloads into frames of at most `max_frame_size` bytes and queues them.
///
/// Callers must serialize access (the session keeps the sender behind a mutex) so the
/// frames of one message stay contiguous in the queue.
#[derive(Debug)]
pub struct FrameSender {
    max_frame_size: usize,
    fragment_payload: usize,
    pool: Arc<BufferPool>,
    queue: mpsc::UnboundedSender<Outbound>,
}

impl FrameSender {
    /// `max_frame_size` is expected to pass [`SessionConfig::validate`](crate::connection::SessionConfig::validate),
    /// smaller sizes still make progress with one payload byte per frame.
    pub fn new(max_frame_size: usize, pool: Arc<BufferPool>, queue: mpsc::UnboundedSender<Outbound>) -> Self {
        let fragment_payload = max_fragment_payload(max_frame_size).max(1);
        Self { max_frame_size, fragment_payload, pool, queue }
    }

    /// Queues `payload` as one message and returns the number of frames it took.
    ///
    /// A message that fits into one frame goes out with FIN set. Otherwise the first
    /// frame carries `opcode`, the following ones are continuations, and only the last
    /// one has FIN set.
    pub fn send(&mut self, opcode: OpCode, payload: &[u8]) -> Result<usize, SendError> {
        if header_len(payload.len()) + payload.len() <= self.max_frame_size {
            self.enqueue(FrameHeader::new(true, opcode, payload.len()), payload)?;
            return Ok(1);
        }

        let count = payload.len().div_ceil(self.fragment_payload);
        for (index, chunk) in payload.chunks(self.fragment_payload).enumerate() {
            let opcode = if index == 0 { opcode } else { OpCode::Continuation };
            self.enqueue(FrameHeader::new(index + 1 == count, opcode, chunk.len()), chunk)?;
        }

        trace!(payload_len = payload.len(), frames = count, "fragmented outbound message");
        Ok(count)
    }

    /// Queues the stop marker for the writer.
    ///
    /// The writer may already be gone after a write failure, which is not an error here.
    pub fn shutdown(&mut self) {
        if self.queue.send(Outbound::Shutdown).is_err() {
            debug!("writer already stopped, shutdown marker dropped");
        }
    }

    fn enqueue(&mut self, header: FrameHeader, payload: &[u8]) -> Result<(), SendError> {
        let mut buffer = self.pool.acquire();
        encode_frame(&mut buffer, header, payload);

        match self.queue.send(Outbound::Frame(buffer)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(outbound)) => {
                if let Outbound::Frame(buffer) = outbound {
                    self.pool.release(buffer);
                }
                Err(SendError::Closed)
            }
        }
    }
}
