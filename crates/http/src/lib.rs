//! Protocol engine of an embeddable websocket debug console.
//!
//! The crate accepts raw TCP connections, reads one HTTP/1.x request per connection and
//! either answers it through a chain of pluggable content providers or upgrades the
//! connection to a websocket (RFC 6455). Upgraded sessions are kept in a
//! [`SessionRegistry`](registry::SessionRegistry), which broadcasts messages to all of
//! them and publishes the frames clients send.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tracing::{info, warn};
//! use wsconsole_http::connection::{Acceptor, HttpSession, SessionConfig, SessionId};
//! use wsconsole_http::handler::DispatchChain;
//! use wsconsole_http::registry::SessionRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let acceptor = Acceptor::bind("127.0.0.1:8080").await?;
//!     let dispatch = Arc::new(DispatchChain::default());
//!     let registry = Arc::new(SessionRegistry::new());
//!     let config = Arc::new(SessionConfig::default());
//!
//!     let broadcaster = Arc::clone(&registry);
//!     tokio::spawn(async move {
//!         loop {
//!             tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!             broadcaster.broadcast_text("tick");
//!         }
//!     });
//!
//!     for id in 1.. {
//!         let (stream, _remote_addr) = acceptor.accept().await?;
//!         let (reader, writer) = stream.into_split();
//!         let session = HttpSession::new(SessionId::new(id), reader, writer, Arc::clone(&config))?;
//!         let (dispatch, registry) = (Arc::clone(&dispatch), Arc::clone(&registry));
//!
//!         tokio::spawn(async move {
//!             match session.process(dispatch, registry).await {
//!                 Ok(()) => info!("connection finished"),
//!                 Err(e) => warn!(cause = %e, "connection finished with error"),
//!             }
//!         });
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`protocol`]: value types ([`Utf8Bytes`](protocol::Utf8Bytes), requests, frames) and errors
//! - [`codec`]: header and frame codecs
//! - [`connection`]: acceptor, per-connection session, websocket send pipeline
//! - [`handler`]: content providers and the dispatch chain
//! - [`registry`]: live websocket sessions
//!
//! # Limitations
//!
//! - one request per connection, no keep-alive, no request bodies
//! - incoming fragmented messages (FIN=0) are rejected
//! - no websocket extensions or sub-protocols, no TLS

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod registry;

mod utils;
pub(crate) use utils::ensure;
