//! Read side of a connection as a sequence of [`ReadEvent`]s.

use std::io;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::trace;

/// One outcome of reading the socket.
#[derive(Debug)]
pub enum ReadEvent {
    /// A chunk of bytes, in arrival order.
    Data(Bytes),
    /// The peer closed its side.
    Closed,
    /// The read failed.
    Failed(io::Error),
}

/// Delivers every chunk read from `R` and then exactly one terminal event,
/// [`ReadEvent::Closed`] or [`ReadEvent::Failed`]. After that [`SocketReader::next`]
/// only returns `None`.
///
/// At most one read is in flight: the next read is only issued when the caller asks for
/// the next event.
#[derive(Debug)]
pub struct SocketReader<R> {
    stream: ReaderStream<R>,
    finished: bool,
}

impl<R> SocketReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, capacity: usize) -> Self {
        Self { stream: ReaderStream::with_capacity(reader, capacity), finished: false }
    }

    /// Reads the next chunk, or yields the terminal event once.
    pub async fn next(&mut self) -> Option<ReadEvent> {
        if self.finished {
            return None;
        }

        let event = match self.stream.next().await {
            Some(Ok(bytes)) => {
                trace!(size = bytes.len(), "read bytes from socket");
                return Some(ReadEvent::Data(bytes));
            }
            Some(Err(e)) => ReadEvent::Failed(e),
            None => ReadEvent::Closed,
        };

        self.finished = true;
        Some(event)
    }

    /// True after the terminal event was returned.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
