//! Decoder for client-to-server websocket frames.
//!
//! Wire layout (RFC 6455 section 5.2):
//!
//! ```text
//! byte 0   FIN | RSV1-3 | opcode(4)
//! byte 1   MASK | len(7)          len 126: 16-bit length follows, 127: 64-bit length follows
//! ...      extended length, big endian
//! ...      4-byte masking key
//! ...      payload
//! ```
//!
//! A frame is only consumed from the source buffer once it is complete. The payload is
//! unmasked in place and handed out as a slice of the frozen frame bytes.

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{FrameError, OpCode, WebSocketFrame, apply_mask};

const FIN_BIT: u8 = 0x80;
const OPCODE_MASK: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LENGTH_MASK: u8 = 0x7F;

const LENGTH_16: u8 = 126;
const LENGTH_64: u8 = 127;

const MASK_KEY_LEN: usize = 4;
const MAX_CONTROL_PAYLOAD: usize = 125;

/// Default cap on the declared payload length of one incoming frame.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    max_payload: usize,
}

impl FrameDecoder {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

impl Decoder for FrameDecoder {
    type Item = WebSocketFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 2 {
            return Ok(None);
        }

        let (first, second) = (src[0], src[1]);
        ensure!(first & FIN_BIT != 0, FrameError::UnsupportedFragmentation);
        let opcode = OpCode::from_u8(first & OPCODE_MASK).ok_or(FrameError::UnsupportedOpcode(first & OPCODE_MASK))?;
        ensure!(second & MASK_BIT != 0, FrameError::Unmasked);

        let (payload_len, mask_start) = match second & LENGTH_MASK {
            LENGTH_16 => {
                if src.len() < 4 {
                    return Ok(None);
                }
                (u64::from(u16::from_be_bytes([src[2], src[3]])), 4)
            }
            LENGTH_64 => {
                if src.len() < 10 {
                    return Ok(None);
                }
                let mut length = [0u8; 8];
                length.copy_from_slice(&src[2..10]);
                (u64::from_be_bytes(length), 10)
            }
            length => (u64::from(length), 2),
        };

        let payload_size = usize::try_from(payload_len).map_err(|_overflow| FrameError::overflow(payload_len))?;
        if opcode.is_control() {
            ensure!(payload_size <= MAX_CONTROL_PAYLOAD, FrameError::ControlFrameTooLarge { size: payload_size });
        }
        ensure!(payload_size <= self.max_payload, FrameError::too_large(payload_size, self.max_payload));

        let payload_start = mask_start + MASK_KEY_LEN;
        let total = payload_start.checked_add(payload_size).ok_or_else(|| FrameError::overflow(payload_len))?;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut mask_key = [0u8; MASK_KEY_LEN];
        mask_key.copy_from_slice(&src[mask_start..payload_start]);

        let mut raw = src.split_to(total);
        apply_mask(&mut raw[payload_start..], mask_key);
        let raw = raw.freeze();

        trace!(?opcode, payload_len, size = total, "decoded websocket frame");
        Ok(Some(WebSocketFrame::new(opcode, payload_len, mask_key, raw.slice(payload_start..), total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FrameHeader, encode_frame};
    use crate::protocol::ByteBuffer;

    const KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    fn masked(opcode: OpCode, payload: &[u8]) -> BytesMut {
        let mut buffer = ByteBuffer::new();
        encode_frame(&mut buffer, FrameHeader::new(true, opcode, payload.len()).with_mask(KEY), payload);
        buffer.into_inner()
    }

    #[test]
    fn decode_rfc_masked_hello() {
        let mut buf = BytesMut::from(&[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58][..]);
        let frame = FrameDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert!(frame.is_fin());
        assert!(frame.is_masked());
        assert_eq!(frame.opcode(), OpCode::Text);
        assert_eq!(frame.mask_key(), KEY);
        assert_eq!(frame.payload_len(), 5);
        assert_eq!(&frame.payload()[..], b"Hello");
        assert_eq!(frame.size(), 11);
        assert!(buf.is_empty());
    }

    #[test]
    fn round_trip_sizes() {
        let mut decoder = FrameDecoder::default();
        for opcode in [OpCode::Text, OpCode::Binary] {
            for size in [0usize, 1, 125, 126, 65535, 65536] {
                let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
                let mut buf = masked(opcode, &payload);
                let encoded_len = buf.len();

                let frame = decoder.decode(&mut buf).unwrap().unwrap();
                assert_eq!(frame.opcode(), opcode);
                assert_eq!(&frame.payload()[..], &payload[..], "payload of size {size}");
                assert_eq!(frame.size(), encoded_len);
                assert!(buf.is_empty());
            }
        }
    }

    #[test]
    fn partial_frame_is_not_consumed() {
        let full = masked(OpCode::Binary, &[7u8; 300]);
        let mut decoder = FrameDecoder::default();

        for cut in [1, 2, 3, 4, 7, 8, full.len() - 1] {
            let mut buf = BytesMut::from(&full[..cut]);
            assert!(decoder.decode(&mut buf).unwrap().is_none(), "cut at {cut}");
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn several_frames_in_one_buffer() {
        let mut buf = masked(OpCode::Text, b"one");
        buf.extend_from_slice(&masked(OpCode::Binary, b"two"));
        buf.extend_from_slice(&masked(OpCode::Text, b"three")[..4]);

        let mut decoder = FrameDecoder::default();
        assert_eq!(&decoder.decode(&mut buf).unwrap().unwrap().payload()[..], b"one");
        assert_eq!(&decoder.decode(&mut buf).unwrap().unwrap().payload()[..], b"two");
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn reject_fragmented_message() {
        let mut buf = masked(OpCode::Text, b"part");
        buf[0] &= !FIN_BIT;

        let result = FrameDecoder::default().decode(&mut buf);
        assert!(matches!(result, Err(FrameError::UnsupportedFragmentation)));
    }

    #[test]
    fn reject_unmasked_frame() {
        let mut buf = BytesMut::from(&[0x81, 0x02, b'h', b'i'][..]);

        let result = FrameDecoder::default().decode(&mut buf);
        assert!(matches!(result, Err(FrameError::Unmasked)));
    }

    #[test]
    fn reject_unknown_opcode() {
        let mut buf = BytesMut::from(&[0x83, 0x80, 0, 0, 0, 0][..]);

        let result = FrameDecoder::default().decode(&mut buf);
        assert!(matches!(result, Err(FrameError::UnsupportedOpcode(0x3))));
    }

    #[test]
    fn reject_large_control_frame() {
        let mut buf = BytesMut::from(&[0x89, 0x80 | 126, 0x00, 0x7E][..]);

        let result = FrameDecoder::default().decode(&mut buf);
        assert!(matches!(result, Err(FrameError::ControlFrameTooLarge { size: 126 })));
    }

    #[test]
    fn reject_payload_over_limit() {
        let mut buf = masked(OpCode::Binary, &[0u8; 200]);

        let result = FrameDecoder::new(100).decode(&mut buf);
        assert!(matches!(result, Err(FrameError::TooLarge { size: 200, max_size: 100 })));
    }

    #[test]
    fn reject_huge_declared_length() {
        let mut buf = BytesMut::from(&[0x82, 0x80 | 127][..]);
        buf.extend_from_slice(&u64::MAX.to_be_bytes());

        let result = FrameDecoder::new(usize::MAX).decode(&mut buf);
        assert!(matches!(result, Err(FrameError::Overflow { length: u64::MAX })));
    }
}
