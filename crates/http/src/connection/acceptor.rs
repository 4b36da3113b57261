use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{info, warn};

/// Listening socket that yields accepted connections.
///
/// Errors caused by a single client going away during the accept are logged and
/// skipped. Any other error is returned and means the listener is unusable.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
}

impl Acceptor {
    /// Binds a new listener to `addrs`.
    pub async fn bind(addrs: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addrs).await?;
        info!(address = ?listener.local_addr().ok(), "start listening");
        Ok(Self { listener })
    }

    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next connection, retrying after transient failures.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        loop {
            match self.listener.accept().await {
                Ok(accepted) => return Ok(accepted),
                Err(e) if is_transient(&e) => {
                    warn!(cause = %e, "failed to accept");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn accepts_connections() {
        let acceptor = Acceptor::bind("127.0.0.1:0").await.unwrap();
        let address = acceptor.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(address).await.unwrap();
            stream.write_all(b"ping").await.unwrap();
        });

        let (mut stream, peer) = acceptor.accept().await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        client.await.unwrap();

        assert_eq!(&buf, b"ping");
        assert!(peer.ip().is_loopback());
    }

    #[test]
    fn classifies_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}
