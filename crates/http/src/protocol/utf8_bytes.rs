//! Zero-copy UTF-8 byte string.
//!
//! [`Utf8Bytes`] is an immutable view over a shared [`Bytes`] buffer. Slicing a view
//! (sub bytes, trim, header value lookup) never copies, it only bumps the reference
//! count of the backing storage. This is what lets the header parser hand out request
//! lines and header lines without allocating per line.
//!
//! Equality, ordering and hashing are byte-wise: two views over different buffers with
//! the same content are equal.

use std::fmt;
use std::fmt::Write as _;
use std::str::Utf8Error;

use bytes::{BufMut, Bytes, BytesMut};

/// An immutable, cheaply clonable view over UTF-8 encoded bytes.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Utf8Bytes {
    bytes: Bytes,
}

impl Utf8Bytes {
    /// Creates a view over a static string, usable in `const` context.
    #[inline]
    pub const fn from_static(str: &'static str) -> Self {
        Self { bytes: Bytes::from_static(str.as_bytes()) }
    }

    /// Creates an empty view.
    #[inline]
    pub const fn new() -> Self {
        Self { bytes: Bytes::new() }
    }

    /// Copies `bytes` into a new backing buffer.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self { bytes: Bytes::copy_from_slice(bytes) }
    }

    /// Formats an integer as its decimal text representation.
    pub fn from_int(value: i64) -> Self {
        let mut buf = BytesMut::with_capacity(20);
        // writing into BytesMut never fails
        let _ = write!(IntWriter(&mut buf), "{value}");
        Self { bytes: buf.freeze() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the backing [`Bytes`] handle for this view.
    #[inline]
    pub fn as_shared(&self) -> &Bytes {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Interprets the view as `&str`, failing if the bytes are not valid UTF-8.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    /// Returns true if `prefix` is a prefix of this view. A prefix longer than the view never matches.
    #[inline]
    pub fn starts_with(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.bytes.starts_with(prefix.as_ref())
    }

    /// Returns true if `suffix` is a suffix of this view. A suffix longer than the view never matches.
    #[inline]
    pub fn ends_with(&self, suffix: impl AsRef<[u8]>) -> bool {
        self.bytes.ends_with(suffix.as_ref())
    }

    /// Position of the first `byte` in the view.
    #[inline]
    pub fn index_of(&self, byte: u8) -> Option<usize> {
        self.index_of_from(0, byte)
    }

    /// Position (relative to the start of the view) of the first `byte` at or after `offset`.
    pub fn index_of_from(&self, offset: usize, byte: u8) -> Option<usize> {
        self.bytes.get(offset..)?.iter().position(|&b| b == byte).map(|pos| pos + offset)
    }

    /// The view from `offset` to the end, sharing the backing buffer.
    ///
    /// # Panics
    ///
    /// Panics if `offset > self.len()`.
    #[inline]
    pub fn sub_bytes(&self, offset: usize) -> Self {
        Self { bytes: self.bytes.slice(offset..) }
    }

    /// The `count` bytes starting at `offset`, sharing the backing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    #[inline]
    pub fn sub_bytes_len(&self, offset: usize, count: usize) -> Self {
        Self { bytes: self.bytes.slice(offset..offset + count) }
    }

    pub fn trim_start(&self) -> Self {
        let start = self.bytes.iter().position(|&b| !is_space(b)).unwrap_or(self.bytes.len());
        self.sub_bytes(start)
    }

    pub fn trim_end(&self) -> Self {
        let end = self.bytes.iter().rposition(|&b| !is_space(b)).map_or(0, |pos| pos + 1);
        Self { bytes: self.bytes.slice(..end) }
    }

    pub fn trim(&self) -> Self {
        self.trim_start().trim_end()
    }

    /// Concatenates two views into a freshly allocated buffer.
    pub fn concat(&self, rhs: impl AsRef<[u8]>) -> Self {
        let rhs = rhs.as_ref();
        let mut buf = BytesMut::with_capacity(self.len() + rhs.len());
        buf.put_slice(&self.bytes);
        buf.put_slice(rhs);
        Self { bytes: buf.freeze() }
    }

    /// Returns true if the view looks like an integer literal: digits, optionally led by `-`.
    pub fn is_int(&self) -> bool {
        let digits = match self.bytes.first() {
            Some(b'-') => &self.bytes[1..],
            _ => &self.bytes[..],
        };
        !digits.is_empty() && digits.iter().all(u8::is_ascii_digit)
    }
}

/// HTTP whitespace plus the other ASCII control spaces.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

struct IntWriter<'a>(&'a mut BytesMut);

impl fmt::Write for IntWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.put_slice(s.as_bytes());
        Ok(())
    }
}

impl AsRef<[u8]> for Utf8Bytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Bytes> for Utf8Bytes {
    #[inline]
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}

impl From<&'static str> for Utf8Bytes {
    #[inline]
    fn from(str: &'static str) -> Self {
        Self::from_static(str)
    }
}

impl From<String> for Utf8Bytes {
    #[inline]
    fn from(string: String) -> Self {
        Self { bytes: Bytes::from(string) }
    }
}

impl From<Utf8Bytes> for Bytes {
    #[inline]
    fn from(value: Utf8Bytes) -> Self {
        value.bytes
    }
}

impl PartialEq<[u8]> for Utf8Bytes {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes[..] == *other
    }
}

impl PartialEq<&[u8]> for Utf8Bytes {
    fn eq(&self, other: &&[u8]) -> bool {
        self.bytes[..] == **other
    }
}

impl PartialEq<str> for Utf8Bytes {
    fn eq(&self, other: &str) -> bool {
        self.bytes[..] == *other.as_bytes()
    }
}

impl PartialEq<&str> for Utf8Bytes {
    fn eq(&self, other: &&str) -> bool {
        self.bytes[..] == *other.as_bytes()
    }
}

impl fmt::Display for Utf8Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl fmt::Debug for Utf8Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*String::from_utf8_lossy(&self.bytes), f)
    }
}
