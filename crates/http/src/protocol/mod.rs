//! Protocol value types shared by the codecs and the connection layer.
//!
//! - [`Utf8Bytes`]: an immutable, cheaply cloneable view over UTF-8 bytes. Every string
//!   handled while parsing (request line, header lines, paths) is one of these, sliced
//!   out of the receive buffer without copying.
//! - [`ByteBuffer`]: the growable sink outgoing frames are assembled in.
//! - [`HttpRequest`], [`ResponseHead`], [`StatusLine`]: the minimal HTTP model.
//! - [`OpCode`], [`WebSocketFrame`]: decoded websocket frames.
//! - [`handshake`]: `Sec-WebSocket-Accept` computation.
//! - error types: [`HttpError`], [`ParseError`], [`FrameError`], [`SendError`].

mod utf8_bytes;
pub use utf8_bytes::Utf8Bytes;

mod byte_buffer;
pub use byte_buffer::ByteBuffer;

mod request;
pub use request::HttpRequest;
pub use request::UpgradeDetection;

mod response;
pub use response::ResponseHead;

mod status;
pub use status::StatusLine;

mod frame;
pub use frame::OpCode;
pub use frame::WebSocketFrame;
pub use frame::apply_mask;

pub mod handshake;

mod error;
pub use error::CLOSE_PROTOCOL_ERROR;
pub use error::CLOSE_TOO_BIG;
pub use error::FrameError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
