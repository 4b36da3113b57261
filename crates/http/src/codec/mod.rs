//! Codecs for the two wire formats spoken on a connection.
//!
//! Before the upgrade a connection carries one HTTP request header block, decoded by
//! [`HeaderDecoder`], and one response, encoded by [`HeaderEncoder`] and written with
//! [`write_response`]. After a websocket upgrade it carries frames, decoded by
//! [`FrameDecoder`] and encoded with [`encode_frame`].
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::Decoder;
//! use wsconsole_http::codec::HeaderDecoder;
//!
//! let mut buffer = BytesMut::from("GET /app/ HTTP/1.0\r\nHost: localhost\r\n\r\n");
//! let request = HeaderDecoder::default().decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.index_path(), "/app/index.html");
//! ```

mod frame;
mod header;
mod response_writer;

pub use frame::DEFAULT_MAX_PAYLOAD;
pub use frame::FrameDecoder;
pub use frame::FrameHeader;
pub use frame::encode_frame;
pub use frame::header_len;
pub use frame::max_fragment_payload;
pub use header::DEFAULT_MAX_HEADER_BYTES;
pub use header::HeaderDecoder;
pub use header::HeaderEncoder;
pub use response_writer::write_head;
pub use response_writer::write_response;
