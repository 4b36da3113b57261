//! Socket doubles and a server-frame parser shared by the connection tests.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::io::AsyncWrite;

use crate::codec::{FrameHeader, encode_frame};
use crate::protocol::{ByteBuffer, OpCode};

/// Records everything written to it. Clones share the recording.
#[derive(Debug, Clone, Default)]
pub(crate) struct CaptureWriter {
    bytes: Arc<Mutex<Vec<u8>>>,
    shutdown: Arc<AtomicBool>,
}

impl CaptureWriter {
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl AsyncWrite for CaptureWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.bytes.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shutdown.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}

/// Fails every write with a broken pipe.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingWriter;

impl AsyncWrite for FailingWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerFrame {
    pub(crate) fin: bool,
    pub(crate) opcode: OpCode,
    pub(crate) payload: Vec<u8>,
}

/// Parses a sequence of complete unmasked frames.
pub(crate) fn parse_server_frames(mut bytes: &[u8]) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        assert_eq!(bytes[1] & 0x80, 0, "server frames are not masked");
        let (len, start) = match bytes[1] & 0x7F {
            126 => (usize::from(u16::from_be_bytes([bytes[2], bytes[3]])), 4),
            127 => (usize::try_from(u64::from_be_bytes(bytes[2..10].try_into().unwrap())).unwrap(), 10),
            len => (usize::from(len), 2),
        };
        frames.push(ServerFrame {
            fin: bytes[0] & 0x80 != 0,
            opcode: OpCode::from_u8(bytes[0] & 0x0F).unwrap(),
            payload: bytes[start..start + len].to_vec(),
        });
        bytes = &bytes[start + len..];
    }
    frames
}

/// A masked client frame with FIN set.
pub(crate) fn client_frame(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mut buffer = ByteBuffer::new();
    encode_frame(&mut buffer, FrameHeader::new(true, opcode, payload.len()).with_mask([0x12, 0x34, 0x56, 0x78]), payload);
    buffer.as_bytes().to_vec()
}
