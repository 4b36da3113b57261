use crate::protocol::{StatusLine, Utf8Bytes};

/// Status line plus header lines of a response, everything before the body.
///
/// Headers are written in insertion order; names are fixed strings known at compile time.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusLine,
    headers: Vec<(&'static str, Utf8Bytes)>,
}

impl ResponseHead {
    pub fn new(status: StatusLine) -> Self {
        Self { status, headers: Vec::new() }
    }

    #[must_use]
    pub fn header(mut self, name: &'static str, value: impl Into<Utf8Bytes>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn content_length(self, length: usize) -> Self {
        self.header("Content-Length", Utf8Bytes::from_int(i64::try_from(length).unwrap_or(i64::MAX)))
    }

    pub fn push_header(&mut self, name: &'static str, value: impl Into<Utf8Bytes>) {
        self.headers.push((name, value.into()));
    }

    pub fn status(&self) -> StatusLine {
        self.status
    }

    pub fn headers(&self) -> &[(&'static str, Utf8Bytes)] {
        &self.headers
    }
}

impl From<StatusLine> for ResponseHead {
    fn from(status: StatusLine) -> Self {
        Self::new(status)
    }
}
