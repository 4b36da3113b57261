//! Parsed HTTP request header.
//!
//! An [`HttpRequest`] keeps the raw request line and header lines as [`Utf8Bytes`]
//! views into the received header block. Everything derived from them (path, header
//! values, upgrade classification) is computed on demand instead of cached.

use std::fmt;

use crate::protocol::Utf8Bytes;

const SPACE: u8 = b' ';

const UPGRADE_WEBSOCKET: &[u8] = b"Upgrade: websocket";
const CONNECTION_UPGRADE: &[u8] = b"Connection: Upgrade";

const SLASH: &[u8] = b"/";
const INDEX_HTML: &[u8] = b"index.html";
const SLASH_INDEX_HTML: &str = "/index.html";

const SEC_WEBSOCKET_KEY: &[u8] = b"Sec-WebSocket-Key";
const SEC_WEBSOCKET_VERSION: &[u8] = b"Sec-WebSocket-Version";

/// How a request is recognized as a websocket upgrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpgradeDetection {
    /// Header lines must equal `Upgrade: websocket` and `Connection: Upgrade` exactly.
    #[default]
    Exact,
    /// Header names and values are compared case-insensitively and `Connection` may
    /// carry a token list, e.g. `Connection: keep-alive, Upgrade`.
    Token,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    request_line: Utf8Bytes,
    headers: Vec<Utf8Bytes>,
}

impl HttpRequest {
    pub fn new(request_line: Utf8Bytes) -> Self {
        Self { request_line, headers: Vec::new() }
    }

    pub fn with_headers(request_line: Utf8Bytes, headers: Vec<Utf8Bytes>) -> Self {
        Self { request_line, headers }
    }

    pub fn push_header(&mut self, line: Utf8Bytes) {
        self.headers.push(line);
    }

    pub fn request_line(&self) -> &Utf8Bytes {
        &self.request_line
    }

    /// Raw header lines, in the order they were received.
    pub fn headers(&self) -> &[Utf8Bytes] {
        &self.headers
    }

    /// The request target between the first and the second space of the request line.
    ///
    /// Empty if the request line does not contain two spaces.
    pub fn path(&self) -> Utf8Bytes {
        let Some(start) = self.request_line.index_of(SPACE) else {
            return Utf8Bytes::new();
        };
        let Some(end) = self.request_line.index_of_from(start + 1, SPACE) else {
            return Utf8Bytes::new();
        };
        self.request_line.sub_bytes_len(start + 1, end - start - 1)
    }

    /// The path with index defaulting applied: an empty path becomes `/index.html` and a
    /// path ending in `/` gets `index.html` appended.
    pub fn index_path(&self) -> Utf8Bytes {
        let path = self.path();
        if path.is_empty() {
            return Utf8Bytes::from_static(SLASH_INDEX_HTML);
        }
        if path.ends_with(SLASH) {
            return path.concat(INDEX_HTML);
        }
        path
    }

    /// Value of the first header called `name`, compared ASCII case-insensitively, with
    /// surrounding whitespace trimmed.
    pub fn header(&self, name: impl AsRef<[u8]>) -> Option<Utf8Bytes> {
        let name = name.as_ref();
        self.headers.iter().find_map(|line| {
            let bytes = line.as_bytes();
            let matches = bytes.len() > name.len() && bytes[..name.len()].eq_ignore_ascii_case(name) && bytes[name.len()] == b':';
            matches.then(|| line.sub_bytes(name.len() + 1).trim())
        })
    }

    pub fn websocket_key(&self) -> Option<Utf8Bytes> {
        self.header(SEC_WEBSOCKET_KEY)
    }

    pub fn websocket_version(&self) -> Option<Utf8Bytes> {
        self.header(SEC_WEBSOCKET_VERSION)
    }

    /// True iff one header line is exactly `Upgrade: websocket` and another is exactly
    /// `Connection: Upgrade`. The comparison is case-sensitive and not token based.
    pub fn is_websocket_upgrade(&self) -> bool {
        let mut has_upgrade = false;
        let mut has_connection = false;
        for line in &self.headers {
            if *line == UPGRADE_WEBSOCKET {
                has_upgrade = true;
            } else if *line == CONNECTION_UPGRADE {
                has_connection = true;
            }
        }
        has_upgrade && has_connection
    }

    /// Token based variant of [`HttpRequest::is_websocket_upgrade`].
    pub fn is_websocket_upgrade_tokens(&self) -> bool {
        let has_token = |name: &[u8], token: &[u8]| {
            self.headers.iter().any(|line| {
                let bytes = line.as_bytes();
                bytes.len() > name.len()
                    && bytes[..name.len()].eq_ignore_ascii_case(name)
                    && bytes[name.len()] == b':'
                    && bytes[name.len() + 1..].split(|&b| b == b',').any(|item| item.trim_ascii().eq_ignore_ascii_case(token))
            })
        };
        has_token(b"Upgrade", b"websocket") && has_token(b"Connection", b"Upgrade")
    }

    pub fn is_upgrade(&self, detection: UpgradeDetection) -> bool {
        match detection {
            UpgradeDetection::Exact => self.is_websocket_upgrade(),
            UpgradeDetection::Token => self.is_websocket_upgrade_tokens(),
        }
    }
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.request_line)
    }
}
