//! Encoding of server-to-client frames.
//!
//! Frames sent by the server are not masked. [`FrameHeader::with_mask`] exists so tests
//! can produce client frames for the decoder.

use tracing::trace;

use crate::protocol::{ByteBuffer, OpCode, apply_mask};

const FIN_BIT: u8 = 0x80;
const MASK_BIT: u8 = 0x80;

const MAX_LENGTH_7: usize = 125;
const MAX_LENGTH_16: usize = u16::MAX as usize;

/// Bytes needed for the fixed header plus the extended length of a `payload_len` frame,
/// without mask key.
#[inline]
pub fn header_len(payload_len: usize) -> usize {
    if payload_len <= MAX_LENGTH_7 {
        2
    } else if payload_len <= MAX_LENGTH_16 {
        4
    } else {
        10
    }
}

/// The largest payload that fits, header included, into one unmasked frame of
/// `frame_size` bytes.
///
/// Returns 0 if `frame_size` cannot even hold a header.
pub fn max_fragment_payload(frame_size: usize) -> usize {
    [(2, MAX_LENGTH_7), (4, MAX_LENGTH_16), (10, usize::MAX)]
        .into_iter()
        .filter_map(|(header, max_payload)| frame_size.checked_sub(header).map(|payload| payload.min(max_payload)))
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    fin: bool,
    opcode: OpCode,
    payload_len: usize,
    mask: Option<[u8; 4]>,
}

impl FrameHeader {
    pub fn new(fin: bool, opcode: OpCode, payload_len: usize) -> Self {
        Self { fin, opcode, payload_len, mask: None }
    }

    #[must_use]
    pub fn with_mask(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    pub fn fin(&self) -> bool {
        self.fin
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Encoded size of this header, mask key included.
    pub fn encoded_len(&self) -> usize {
        header_len(self.payload_len) + if self.mask.is_some() { 4 } else { 0 }
    }

    pub fn encode(&self, dst: &mut ByteBuffer) {
        let first = if self.fin { FIN_BIT } else { 0 } | self.opcode.as_u8();
        let mask_bit = if self.mask.is_some() { MASK_BIT } else { 0 };
        dst.push_u8(first);

        match self.payload_len {
            len if len <= MAX_LENGTH_7 => dst.push_u8(mask_bit | len as u8),
            len if len <= MAX_LENGTH_16 => {
                dst.push_u8(mask_bit | 126);
                dst.push_u16(len as u16);
            }
            len => {
                dst.push_u8(mask_bit | 127);
                dst.push_u64(len as u64);
            }
        }

        if let Some(key) = self.mask {
            dst.push_slice(&key);
        }
    }
}

/// Appends one complete frame, header followed by payload, to `dst`.
///
/// The payload is masked in `dst` if the header carries a mask key.
pub fn encode_frame(dst: &mut ByteBuffer, header: FrameHeader, payload: &[u8]) {
    debug_assert_eq!(header.payload_len(), payload.len());

    header.encode(dst);
    let payload_start = dst.len();
    dst.push_slice(payload);
    if let Some(key) = header.mask {
        apply_mask(&mut dst.as_bytes_mut()[payload_start..], key);
    }

    trace!(fin = header.fin, opcode = ?header.opcode, payload_len = payload.len(), "encoded websocket frame");
}
