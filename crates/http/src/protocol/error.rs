use std::io;
use std::time::Duration;
use thiserror::Error;

/// WebSocket close status: protocol error.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;

/// WebSocket close status: message too big.
pub const CLOSE_TOO_BIG: u16 = 1009;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("websocket frame error: {source}")]
    FrameError {
        #[from]
        source: FrameError,
    },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header not completed within {timeout:?}")]
    HeaderTimeout { timeout: Duration },

    #[error("no http request")]
    EmptyRequest,

    #[error("websocket upgrade without Sec-WebSocket-Key header")]
    MissingWebSocketKey,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn header_timeout(timeout: Duration) -> Self {
        Self::HeaderTimeout { timeout }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while decoding a client-to-server websocket frame.
///
/// Every variant except [`FrameError::Io`] is a protocol violation by the peer and
/// terminates only that peer's session.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("fragmented incoming message (FIN=0) is not supported")]
    UnsupportedFragmentation,

    #[error("client frame is not masked")]
    Unmasked,

    #[error("unsupported opcode {0:#x}")]
    UnsupportedOpcode(u8),

    #[error("control frame payload of {size} bytes exceeds 125")]
    ControlFrameTooLarge { size: usize },

    #[error("payload length {length} overflows the addressable size")]
    Overflow { length: u64 },

    #[error("payload size too large, current: {size} exceed the limit {max_size}")]
    TooLarge { size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl FrameError {
    pub fn overflow(length: u64) -> Self {
        Self::Overflow { length }
    }

    pub fn too_large(size: usize, max_size: usize) -> Self {
        Self::TooLarge { size, max_size }
    }

    /// The close status sent to the peer before the session is dropped.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::UnsupportedFragmentation
            | Self::Unmasked
            | Self::UnsupportedOpcode(_)
            | Self::ControlFrameTooLarge { .. } => Some(CLOSE_PROTOCOL_ERROR),
            Self::Overflow { .. } | Self::TooLarge { .. } => Some(CLOSE_TOO_BIG),
            Self::Io { .. } => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("session is closed")]
    Closed,

    #[error("unsupported http version {0}")]
    UnsupportedVersion(String),

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
