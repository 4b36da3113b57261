//! Connection handling.
//!
//! An accepted socket is driven by an [`HttpSession`]: it reads the request header
//! through a [`SocketReader`], then either answers through the
//! [`DispatchChain`](crate::handler::DispatchChain) and closes, or performs the websocket
//! handshake and hands the write half to a [`WebSocketSession`].
//!
//! The websocket send path is split in two:
//!
//! - the sending side ([`WebSocketSession::send_frame`]) fragments a message into frames
//!   under the session lock, encodes each into a buffer from the session's
//!   [`BufferPool`] and queues it;
//! - a writer task drains the queue in order, writes each buffer to the socket and gives
//!   it back to the pool.
//!
//! Reads and writes of one connection run concurrently, so a slow reader does not hold
//! up broadcasts and the other way round.

mod acceptor;
mod buffer_pool;
mod config;
mod frame_sender;
mod frame_writer;
mod http_session;
mod session_id;
mod socket_reader;
mod websocket_session;

#[cfg(test)]
pub(crate) mod test_util;

pub use acceptor::Acceptor;
pub use buffer_pool::BufferPool;
pub use config::ConfigError;
pub use config::SessionConfig;
pub use frame_sender::FrameSender;
pub use frame_sender::Outbound;
pub use frame_writer::FrameWriter;
pub use http_session::HttpSession;
pub use session_id::SessionId;
pub use socket_reader::ReadEvent;
pub use socket_reader::SocketReader;
pub use websocket_session::WebSocketSession;
