//! One accepted connection, from the request header to the end of its websocket session.
//!
//! ```text
//! awaiting headers ──► plain request ──► dispatch chain, close
//!        │
//!        └──────────► upgrade ──► 101, frames until close / error / EOF
//! ```
//!
//! Parsing or dispatch failures are answered with `500` and the error text before the
//! connection closes. Websocket protocol violations are answered with a close frame
//! carrying the matching status code.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio_util::codec::Decoder;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::codec::{FrameDecoder, HeaderDecoder, write_head, write_response};
use crate::connection::{ConfigError, ReadEvent, SessionConfig, SessionId, SocketReader, WebSocketSession};
use crate::handler::DispatchChain;
use crate::protocol::handshake;
use crate::protocol::{
    ByteBuffer, HttpError, HttpRequest, OpCode, ParseError, ResponseHead, SendError, StatusLine, Utf8Bytes,
    WebSocketFrame,
};
use crate::registry::SessionRegistry;

#[derive(Debug)]
pub struct HttpSession<R, W> {
    id: SessionId,
    reader: SocketReader<R>,
    writer: W,
    buffer: ByteBuffer,
    config: Arc<SessionConfig>,
}

impl<R, W> HttpSession<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Creates the session for one accepted connection.
    ///
    /// Fails if `config` does not pass [`SessionConfig::validate`].
    pub fn new(id: SessionId, reader: R, writer: W, config: Arc<SessionConfig>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id,
            reader: SocketReader::new(reader, config.read_buffer_size()),
            writer,
            buffer: ByteBuffer::with_capacity(config.read_buffer_size()),
            config,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Serves the connection until it is closed.
    ///
    /// The returned error is informational: by then the peer has been answered and the
    /// connection is gone.
    pub async fn process(self, dispatch: Arc<DispatchChain>, registry: Arc<SessionRegistry>) -> Result<(), HttpError> {
        let span = info_span!("session", id = %self.id);
        self.do_process(&dispatch, &registry).instrument(span).await
    }

    async fn do_process(mut self, dispatch: &DispatchChain, registry: &SessionRegistry) -> Result<(), HttpError> {
        let request = match self.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("connection closed before a request was received");
                return Ok(());
            }
            Err(e) => {
                warn!(cause = %e, "failed to read request");
                self.respond_error(e.to_string()).await;
                return Err(e.into());
            }
        };

        if !request.is_upgrade(self.config.upgrade_detection()) {
            return self.respond(&request, dispatch).await;
        }

        let Some(key) = request.websocket_key() else {
            let e = ParseError::MissingWebSocketKey;
            warn!(request = %request, cause = %e, "rejected websocket upgrade");
            self.respond_error(e.to_string()).await;
            return Err(e.into());
        };

        self.upgrade(&request, &key, registry).await
    }

    async fn read_request(&mut self) -> Result<Option<HttpRequest>, ParseError> {
        let mut decoder = HeaderDecoder::new(self.config.max_header_bytes());
        let read = read_header(&mut self.reader, &mut self.buffer, &mut decoder);

        match self.config.header_timeout() {
            Some(timeout) => {
                tokio::time::timeout(timeout, read).await.map_err(|_elapsed| ParseError::header_timeout(timeout))?
            }
            None => read.await,
        }
    }

    async fn respond(mut self, request: &HttpRequest, dispatch: &DispatchChain) -> Result<(), HttpError> {
        if let Err(e) = dispatch.respond(request, &mut self.writer).await {
            warn!(request = %request, cause = %e, "failed to respond");
            self.respond_error(e.to_string()).await;
            return Err(e.into());
        }

        info!(request = %request, "request served");
        self.writer.shutdown().await.map_err(SendError::io)?;
        Ok(())
    }

    async fn respond_error(&mut self, message: String) {
        let head = ResponseHead::new(StatusLine::INTERNAL_ERROR);
        if let Err(e) = write_response(&mut self.writer, &head, message.as_bytes()).await {
            debug!(cause = %e, "failed to send error response");
            return;
        }
        if let Err(e) = self.writer.shutdown().await {
            debug!(cause = %e, "failed to shutdown connection");
        }
    }

    async fn upgrade(self, request: &HttpRequest, key: &Utf8Bytes, registry: &SessionRegistry) -> Result<(), HttpError> {
        let Self { id, mut reader, mut writer, mut buffer, config } = self;

        write_head(&mut writer, &handshake::upgrade_response(key)).await?;
        info!(path = %request.path(), "websocket upgraded");

        let (session, writer_task) = WebSocketSession::start(id, writer, &config);
        if !registry.add(Arc::clone(&session)) {
            debug!("session registry closed, websocket session ends");
        }

        let mut decoder = FrameDecoder::new(config.max_incoming_payload());
        let result = read_frames(&mut reader, &mut buffer, &mut decoder, &session, registry).await;

        session.close();
        registry.remove(id);
        if let Err(e) = writer_task.await {
            warn!(cause = %e, "websocket writer task failed");
        }

        debug!("websocket session finished");
        result
    }
}

async fn read_header<R>(
    reader: &mut SocketReader<R>,
    buffer: &mut ByteBuffer,
    decoder: &mut HeaderDecoder,
) -> Result<Option<HttpRequest>, ParseError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(request) = decoder.decode(buffer.as_bytes_mut())? {
            return Ok(Some(request));
        }

        match reader.next().await {
            Some(ReadEvent::Data(bytes)) => buffer.push_slice(&bytes),
            Some(ReadEvent::Failed(e)) => return Err(ParseError::io(e)),
            Some(ReadEvent::Closed) | None => return Ok(None),
        }
    }
}

/// Decodes and handles frames until the peer closes, the session is closed locally or a
/// protocol violation occurs. Socket errors end the loop like a regular close.
async fn read_frames<R>(
    reader: &mut SocketReader<R>,
    buffer: &mut ByteBuffer,
    decoder: &mut FrameDecoder,
    session: &WebSocketSession,
    registry: &SessionRegistry,
) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
{
    loop {
        // everything already buffered first, bytes that arrived with the header included
        loop {
            match decoder.decode(buffer.as_bytes_mut()) {
                Ok(Some(frame)) => {
                    if !handle_frame(session, registry, frame) {
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(cause = %e, "websocket protocol error");
                    if let Some(code) = e.close_code()
                        && let Err(send_error) = session.send_frame(OpCode::Close, &code.to_be_bytes())
                    {
                        debug!(cause = %send_error, code, "failed to send close frame");
                    }
                    return Err(e.into());
                }
            }
        }

        let event = select! {
            () = session.closed() => {
                debug!("websocket session closed locally");
                return Ok(());
            }
            event = reader.next() => event,
        };

        match event {
            Some(ReadEvent::Data(bytes)) => buffer.push_slice(&bytes),
            Some(ReadEvent::Failed(e)) => {
                debug!(cause = %e, "websocket read failed");
                return Ok(());
            }
            Some(ReadEvent::Closed) | None => {
                debug!("peer closed websocket connection");
                return Ok(());
            }
        }
    }
}

/// Returns false once the session should end.
fn handle_frame(session: &WebSocketSession, registry: &SessionRegistry, frame: WebSocketFrame) -> bool {
    trace!(frame = %frame, "received websocket frame");
    match frame.opcode() {
        OpCode::Close => {
            debug!("peer sent close frame");
            if let Err(e) = session.send_frame(OpCode::Close, frame.payload()) {
                debug!(cause = %e, "failed to echo close frame");
            }
            false
        }
        OpCode::Ping => session.send_frame(OpCode::Pong, frame.payload()).is_ok(),
        OpCode::Pong => true,
        OpCode::Text | OpCode::Binary | OpCode::Continuation => {
            registry.deliver(session.id(), frame);
            true
        }
    }
}
