//! Encoder for the response status line and header lines.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{ResponseHead, SendError};

/// Initial buffer size reserved for a response head.
const INIT_HEADER_SIZE: usize = 256;

/// Writes `<version> <code> <reason>\r\n`, then `<name>: <value>\r\n` per header and a
/// final blank line.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<ResponseHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&ResponseHead>>::encode(self, &head, dst)
    }
}

impl Encoder<&ResponseHead> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, head: &ResponseHead, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let status = head.status();
        let Some(version) = status.version_str() else {
            error!(http_version = ?status.version(), "unsupported http version");
            return Err(SendError::UnsupportedVersion(format!("{:?}", status.version())));
        };

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "{} {} {}\r\n", version, status.code().as_str(), status.reason())?;

        for (name, value) in head.headers() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut` that has already reserved enough room.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{StatusLine, Utf8Bytes};
    use http::{StatusCode, Version};

    #[test]
    fn encode_status_and_headers() {
        let head = ResponseHead::new(StatusLine::OK)
            .header("Content-Type", Utf8Bytes::from_static("text/html"))
            .content_length(12);

        let mut buf = BytesMut::new();
        HeaderEncoder.encode(head, &mut buf).unwrap();

        assert_eq!(&buf[..], b"HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nContent-Length: 12\r\n\r\n");
    }

    #[test]
    fn encode_bare_status() {
        let mut buf = BytesMut::new();
        HeaderEncoder.encode(ResponseHead::new(StatusLine::NOT_FOUND), &mut buf).unwrap();

        assert_eq!(&buf[..], b"HTTP/1.0 404 NOT FOUND\r\n\r\n");
    }

    #[test]
    fn reject_unsupported_version() {
        let status = StatusLine::new(Version::HTTP_2, StatusCode::OK, "OK");
        let mut buf = BytesMut::new();
        let result = HeaderEncoder.encode(ResponseHead::new(status), &mut buf);

        assert!(matches!(result, Err(SendError::UnsupportedVersion(_))));
        assert!(buf.is_empty());
    }
}
