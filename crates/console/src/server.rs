use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use thiserror::Error;
use tokio::select;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wsconsole_http::connection::{Acceptor, ConfigError, HttpSession, SessionConfig, SessionId};
use wsconsole_http::handler::{ContentProvider, DispatchChain, DispatchChainBuilder};
use wsconsole_http::protocol::OpCode;
use wsconsole_http::registry::{InboundFrame, SessionRegistry};

pub struct ConsoleBuilder {
    address: Option<io::Result<Vec<SocketAddr>>>,
    config: SessionConfig,
    dispatch: DispatchChainBuilder,
}

impl ConsoleBuilder {
    fn new() -> Self {
        Self { address: None, config: SessionConfig::default(), dispatch: DispatchChain::builder() }
    }

    /// The address to listen on. Resolved by [`ConsoleBuilder::build`].
    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    /// Listens on every interface at `port`.
    #[must_use]
    pub fn port(self, port: u16) -> Self {
        self.address(("0.0.0.0", port))
    }

    #[must_use]
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Maximum size of one outbound websocket frame; larger messages are fragmented.
    #[must_use]
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config = self.config.with_max_frame_size(size);
        self
    }

    /// Appends a content provider. Providers are asked in mount order.
    #[must_use]
    pub fn mount(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.dispatch = self.dispatch.provider(provider);
        self
    }

    /// Answers requests no mounted provider matches.
    #[must_use]
    pub fn fallback(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.dispatch = self.dispatch.fallback(provider);
        self
    }

    pub fn build(self) -> Result<Console, BuildError> {
        let address = self.address.ok_or(BuildError::MissingAddress)?.map_err(BuildError::InvalidAddress)?;
        if address.is_empty() {
            return Err(BuildError::MissingAddress);
        }
        self.config.validate()?;

        Ok(Console {
            address,
            config: Arc::new(self.config),
            dispatch: Arc::new(self.dispatch.build()),
            registry: Arc::new(SessionRegistry::new()),
            shutdown: CancellationToken::new(),
        })
    }
}

impl std::fmt::Debug for ConsoleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleBuilder").field("address", &self.address).field("config", &self.config).finish_non_exhaustive()
    }
}

/// Why [`ConsoleBuilder::build`] refused the configuration.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("address must be set")]
    MissingAddress,

    #[error("invalid address: {0}")]
    InvalidAddress(io::Error),

    #[error("invalid session config: {source}")]
    InvalidConfig {
        #[from]
        source: ConfigError,
    },
}

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("failed to bind {address:?}: {source}")]
    Bind { address: Vec<SocketAddr>, source: io::Error },

    #[error("failed to accept connection: {0}")]
    Accept(io::Error),

    #[error("invalid session config: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

/// A configured console that is not listening yet.
#[derive(Debug)]
pub struct Console {
    address: Vec<SocketAddr>,
    config: Arc<SessionConfig>,
    dispatch: Arc<DispatchChain>,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl Console {
    pub fn builder() -> ConsoleBuilder {
        ConsoleBuilder::new()
    }

    /// A handle to publish to the console. Handles can be taken before the console starts.
    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle { registry: Arc::clone(&self.registry), shutdown: self.shutdown.clone() }
    }

    /// Binds the listener without accepting yet.
    pub async fn bind(self) -> Result<BoundConsole, ConsoleError> {
        let acceptor = match Acceptor::bind(self.address.as_slice()).await {
            Ok(acceptor) => acceptor,
            Err(e) => {
                error!(address = ?self.address, cause = %e, "bind console error");
                return Err(ConsoleError::Bind { address: self.address, source: e });
            }
        };

        Ok(BoundConsole {
            acceptor,
            config: self.config,
            dispatch: self.dispatch,
            registry: self.registry,
            shutdown: self.shutdown,
        })
    }

    /// Binds and serves until [`ConsoleHandle::shutdown`] or a fatal accept error.
    pub async fn start(self) -> Result<(), ConsoleError> {
        self.bind().await?.serve().await
    }
}

/// A console with a bound listener.
#[derive(Debug)]
pub struct BoundConsole {
    acceptor: Acceptor,
    config: Arc<SessionConfig>,
    dispatch: Arc<DispatchChain>,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl BoundConsole {
    /// The address the listener is bound to, useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    pub fn handle(&self) -> ConsoleHandle {
        ConsoleHandle { registry: Arc::clone(&self.registry), shutdown: self.shutdown.clone() }
    }

    /// Accepts connections until shutdown or a fatal accept error.
    ///
    /// On return every websocket session is closed and every connection task has ended.
    /// Connections still being served when shutdown is requested are dropped.
    pub async fn serve(self) -> Result<(), ConsoleError> {
        let tracker = TaskTracker::new();
        let mut next_id = 0u64;

        let result = loop {
            let (tcp_stream, remote_addr) = select! {
                () = self.shutdown.cancelled() => {
                    info!("console shutdown requested");
                    break Ok(());
                }
                accepted = self.acceptor.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        error!(cause = %e, "listener failed, console stopped");
                        break Err(ConsoleError::Accept(e));
                    }
                },
            };

            if let Err(e) = tcp_stream.set_nodelay(true) {
                debug!(cause = %e, "failed to set TCP_NODELAY");
            }

            next_id += 1;
            let (reader, writer) = tcp_stream.into_split();
            let session = match HttpSession::new(SessionId::new(next_id), reader, writer, Arc::clone(&self.config)) {
                Ok(session) => session,
                Err(e) => {
                    error!(cause = %e, "invalid session config, console stopped");
                    break Err(e.into());
                }
            };
            let dispatch = Arc::clone(&self.dispatch);
            let registry = Arc::clone(&self.registry);
            let shutdown = self.shutdown.clone();

            tracker.spawn(async move {
                select! {
                    result = session.process(dispatch, registry) => match result {
                        Ok(()) => debug!(remote = %remote_addr, "connection finished"),
                        Err(e) => warn!(remote = %remote_addr, cause = %e, "connection finished with error"),
                    },
                    () = shutdown.cancelled() => debug!(remote = %remote_addr, "connection dropped on shutdown"),
                }
            });
        };

        self.shutdown.cancel();
        self.registry.close();
        tracker.close();
        tracker.wait().await;
        debug!("all connections finished");
        result
    }
}

/// Cheap, cloneable access to a running console.
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl ConsoleHandle {
    /// Broadcasts one message to every connected page and returns how many accepted it.
    pub fn publish(&self, opcode: OpCode, payload: &[u8]) -> usize {
        self.registry.broadcast(opcode, payload)
    }

    /// Broadcasts `text` as one text message, see [`ConsoleHandle::publish`].
    pub fn publish_text(&self, text: &str) -> usize {
        self.registry.broadcast_text(text)
    }

    /// Messages sent by connected pages.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundFrame> {
        self.registry.subscribe()
    }

    /// Number of connected websocket sessions.
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// The registry of the console's websocket sessions, to register sessions served
    /// outside the console or to broadcast with other opcodes.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Stops accepting connections and closes every websocket session. Connections
    /// upgrading afterwards are closed as soon as they register.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.registry.close();
    }

    /// True once [`ConsoleHandle::shutdown`] was called or the console stopped serving.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::StaticContent;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use std::time::Duration;
    use tokio::net::TcpStream;

    async fn bound() -> (BoundConsole, SocketAddr) {
        let console = Console::builder()
            .address("127.0.0.1:0")
            .mount(StaticContent::from_bytes("/index.html", &b"<h1>console</h1>"[..]))
            .build()
            .unwrap();
        let bound = console.bind().await.unwrap();
        let address = bound.local_addr().unwrap();
        (bound, address)
    }

    async fn read_head(stream: &mut TcpStream) -> String {
        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            head.push(stream.read_u8().await.unwrap());
        }
        String::from_utf8(head).unwrap()
    }

    #[test]
    fn build_requires_address() {
        assert!(matches!(Console::builder().build(), Err(BuildError::MissingAddress)));
    }

    #[test]
    fn build_validates_config() {
        let result = Console::builder().port(0).max_frame_size(8).build();
        assert!(matches!(result, Err(BuildError::InvalidConfig { source: ConfigError::FrameSizeTooSmall(8) })));
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (bound, address) = bound().await;
        let result = Console::builder().address(address).build().unwrap().bind().await;

        assert!(matches!(result, Err(ConsoleError::Bind { .. })));
        drop(bound);
    }

    #[tokio::test]
    async fn serves_files_and_websocket_until_shutdown() {
        let (bound, address) = bound().await;
        let handle = bound.handle();
        let server = tokio::spawn(bound.serve());

        let mut http = TcpStream::connect(address).await.unwrap();
        http.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
        let mut response = Vec::new();
        http.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\n<h1>console</h1>"));

        let mut ws = TcpStream::connect(address).await.unwrap();
        ws.write_all(
            b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
        )
        .await
        .unwrap();
        assert!(read_head(&mut ws).await.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));

        while handle.session_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.publish_text("log line"), 1);
        let mut frame = [0u8; 10];
        ws.read_exact(&mut frame).await.unwrap();
        assert_eq!(&frame, b"\x81\x08log line");

        handle.shutdown();
        server.await.unwrap().unwrap();
        assert!(handle.is_shutdown());
        assert_eq!(handle.session_count(), 0);

        let mut rest = Vec::new();
        ws.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn connections_pending_at_shutdown_never_upgrade() {
        let (bound, address) = bound().await;
        let handle = bound.handle();
        let server = tokio::spawn(bound.serve());

        let mut ws = TcpStream::connect(address).await.unwrap();
        ws.write_all(b"GET /ws HTTP/1.1\r\nUpgrade: websocket\r\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.shutdown();
        server.await.unwrap().unwrap();

        // the server side is gone, so writing or reading may fail
        let _ = ws.write_all(b"Connection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n").await;
        let mut response = Vec::new();
        let _ = ws.read_to_end(&mut response).await;

        assert!(!String::from_utf8_lossy(&response).contains("101"));
        assert_eq!(handle.session_count(), 0);
        assert_eq!(handle.publish_text("after shutdown"), 0);
    }
}
