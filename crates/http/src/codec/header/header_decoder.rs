//! Decoder for the request header block.
//!
//! The decoder accumulates bytes until the `\r\n\r\n` terminator shows up, then cuts the
//! block off the front of the buffer and splits it into the request line and header
//! lines. Lines are [`Utf8Bytes`] slices of the frozen block, nothing is copied.
//!
//! TCP may deliver the block in arbitrary pieces, so the scan position is remembered
//! between calls and only the new bytes (plus the three that could start a terminator)
//! are looked at again.
//!
//! Bytes following the terminator are left in the source buffer untouched.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{HttpRequest, ParseError, Utf8Bytes};

const CRLF: &[u8] = b"\r\n";
const CRLF_CRLF: &[u8] = b"\r\n\r\n";

/// Default cap on the size of the header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

#[derive(Debug)]
pub struct HeaderDecoder {
    max_header_bytes: usize,
    scanned: usize,
}

impl HeaderDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes, scanned: 0 }
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    fn find_terminator(&self, src: &[u8]) -> Option<usize> {
        let start = self.scanned.saturating_sub(CRLF_CRLF.len() - 1);
        if src.len() < start + CRLF_CRLF.len() {
            return None;
        }

        (start..=src.len() - CRLF_CRLF.len()).find(|&i| &src[i..i + CRLF_CRLF.len()] == CRLF_CRLF)
    }
}

impl Default for HeaderDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES)
    }
}

impl Decoder for HeaderDecoder {
    type Item = HttpRequest;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(index) = self.find_terminator(src) else {
            ensure!(src.len() <= self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
            trace!(buffered = src.len(), "header block not completed, wait for more bytes");
            self.scanned = src.len();
            return Ok(None);
        };

        let block_len = index + CRLF_CRLF.len();
        ensure!(block_len <= self.max_header_bytes, ParseError::too_large_header(block_len, self.max_header_bytes));

        self.scanned = 0;
        let block = src.split_to(block_len).freeze();

        // the last header line keeps its own CRLF, the blank line does not
        let mut lines = split_lines(block.slice(..index + CRLF.len()));
        let request_line = lines.next().unwrap_or_default();
        ensure!(!request_line.is_empty(), ParseError::EmptyRequest);

        let request = HttpRequest::with_headers(request_line, lines.collect());
        trace!(header_size = block_len, header_count = request.headers().len(), "parsed header block");
        Ok(Some(request))
    }
}

/// Splits CRLF-terminated lines into views of `bytes`, without the CRLF.
fn split_lines(bytes: Bytes) -> impl Iterator<Item = Utf8Bytes> {
    let mut position = 0;
    std::iter::from_fn(move || {
        if position >= bytes.len() {
            return None;
        }

        let rest = &bytes[position..];
        let end = rest.windows(CRLF.len()).position(|w| w == CRLF).map_or(bytes.len(), |i| position + i);
        let line = bytes.slice(position..end);
        position = end + CRLF.len();
        Some(Utf8Bytes::from(line))
    })
}
