//! WebSocket frame value types (RFC 6455 section 5.2).

use std::fmt;

use bytes::Bytes;

/// WebSocket opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl OpCode {
    #[inline]
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x0 => Some(OpCode::Continuation),
            0x1 => Some(OpCode::Text),
            0x2 => Some(OpCode::Binary),
            0x8 => Some(OpCode::Close),
            0x9 => Some(OpCode::Ping),
            0xA => Some(OpCode::Pong),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_control(self) -> bool {
        self.as_u8() >= 0x8
    }
}

/// One decoded client-to-server frame.
///
/// The payload aliases the receive buffer the frame was cut from and has already been
/// unmasked in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketFrame {
    fin: bool,
    opcode: OpCode,
    masked: bool,
    payload_len: u64,
    mask_key: [u8; 4],
    payload: Bytes,
    size: usize,
}

impl WebSocketFrame {
    pub(crate) fn new(opcode: OpCode, payload_len: u64, mask_key: [u8; 4], payload: Bytes, size: usize) -> Self {
        Self { fin: true, opcode, masked: true, payload_len, mask_key, payload, size }
    }

    pub fn is_fin(&self) -> bool {
        self.fin
    }

    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    pub fn mask_key(&self) -> [u8; 4] {
        self.mask_key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Total bytes the frame occupied on the wire: header, extended length, mask key and payload.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl fmt::Display for WebSocketFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            OpCode::Text => {
                write!(f, "FIN={} Op={:?} Payload={}", self.fin, self.opcode, String::from_utf8_lossy(&self.payload))
            }
            _ => write!(f, "FIN={} Op={:?} Payload={}", self.fin, self.opcode, self.payload_len),
        }
    }
}

/// XORs `buf` with the repeating 4-byte `key`, i.e. `buf[i] ^= key[i % 4]`.
///
/// Masking is an involution: applying the same key twice restores the input.
#[inline]
pub fn apply_mask(buf: &mut [u8], key: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trip() {
        for op in [OpCode::Continuation, OpCode::Text, OpCode::Binary, OpCode::Close, OpCode::Ping, OpCode::Pong] {
            assert_eq!(OpCode::from_u8(op.as_u8()), Some(op));
        }
        assert_eq!(OpCode::from_u8(0x3), None);
        assert_eq!(OpCode::from_u8(0xB), None);
        assert!(OpCode::Ping.is_control());
        assert!(!OpCode::Binary.is_control());
    }

    #[test]
    fn mask_rfc_sample() {
        // RFC 6455 section 5.7, single-frame masked text message "Hello"
        let mut payload = [0x7f, 0x9f, 0x4d, 0x51, 0x58];
        apply_mask(&mut payload, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(&payload, b"Hello");
    }
}
