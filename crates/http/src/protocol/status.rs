//! The fixed set of status lines this server emits.
//!
//! Plain responses are HTTP/1.0 (the connection is closed after the body), only the
//! websocket upgrade answers with HTTP/1.1.

use std::fmt;

use http::{StatusCode, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLine {
    version: Version,
    code: StatusCode,
    reason: &'static str,
}

impl StatusLine {
    pub const OK: StatusLine = StatusLine::new(Version::HTTP_10, StatusCode::OK, "OK");
    pub const NOT_FOUND: StatusLine = StatusLine::new(Version::HTTP_10, StatusCode::NOT_FOUND, "NOT FOUND");
    pub const INTERNAL_ERROR: StatusLine =
        StatusLine::new(Version::HTTP_10, StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL ERROR");
    pub const SWITCHING_PROTOCOLS: StatusLine =
        StatusLine::new(Version::HTTP_11, StatusCode::SWITCHING_PROTOCOLS, "Switching Protocols");

    pub const fn new(version: Version, code: StatusCode, reason: &'static str) -> Self {
        Self { version, code, reason }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }

    /// The textual protocol version, `None` for versions this server never speaks.
    pub fn version_str(&self) -> Option<&'static str> {
        match self.version {
            Version::HTTP_10 => Some("HTTP/1.0"),
            Version::HTTP_11 => Some("HTTP/1.1"),
            _ => None,
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.version_str().unwrap_or("HTTP/?"), self.code.as_str(), self.reason)
    }
}
