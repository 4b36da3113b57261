//! Header block codecs.
//!
//! - [`HeaderDecoder`]: finds the `\r\n\r\n` terminated request header block and splits it
//!   into an [`HttpRequest`](crate::protocol::HttpRequest), enforcing a size cap.
//! - [`HeaderEncoder`]: serializes a [`ResponseHead`](crate::protocol::ResponseHead).

mod header_decoder;
mod header_encoder;

pub use header_decoder::DEFAULT_MAX_HEADER_BYTES;
pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
