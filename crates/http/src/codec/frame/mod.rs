//! Websocket frame codec.
//!
//! - [`FrameDecoder`]: a [`tokio_util::codec::Decoder`] yielding unmasked
//!   [`WebSocketFrame`](crate::protocol::WebSocketFrame)s from client bytes.
//! - [`FrameHeader`] and [`encode_frame`]: server frame encoding, plus the sizing helpers
//!   the fragmenting sender relies on.

mod frame_decoder;
mod frame_encoder;

pub use frame_decoder::DEFAULT_MAX_PAYLOAD;
pub use frame_decoder::FrameDecoder;
pub use frame_encoder::FrameHeader;
pub use frame_encoder::encode_frame;
pub use frame_encoder::header_len;
pub use frame_encoder::max_fragment_payload;
