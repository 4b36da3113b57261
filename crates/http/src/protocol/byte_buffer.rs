//! Growable byte sink used to assemble outgoing frames and to accumulate incoming bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A growable byte buffer backed by [`BytesMut`].
///
/// Pushing past the capacity reallocates geometrically, so a buffer that is reused
/// (see the per-session buffer pool) stops allocating once it reached its working size.
/// [`ByteBuffer::unshift`] drops bytes from the front without copying the remainder.
#[derive(Debug, Default)]
pub struct ByteBuffer {
    inner: BytesMut,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: BytesMut::with_capacity(capacity) }
    }

    #[inline]
    pub fn push_u8(&mut self, byte: u8) {
        self.inner.put_u8(byte);
    }

    #[inline]
    pub fn push_u16(&mut self, value: u16) {
        self.inner.put_u16(value);
    }

    #[inline]
    pub fn push_u64(&mut self, value: u64) {
        self.inner.put_u64(value);
    }

    #[inline]
    pub fn push_slice(&mut self, bytes: &[u8]) {
        self.inner.put_slice(bytes);
    }

    /// Removes `count` bytes from the front of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `count > self.len()`.
    #[inline]
    pub fn unshift(&mut self, count: usize) {
        self.inner.advance(count);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Mutable access to the underlying buffer, used to drive `tokio_util` decoders.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.inner
    }

    #[inline]
    pub fn into_inner(self) -> BytesMut {
        self.inner
    }

    #[inline]
    pub fn freeze(self) -> Bytes {
        self.inner.freeze()
    }
}

impl From<BytesMut> for ByteBuffer {
    fn from(inner: BytesMut) -> Self {
        Self { inner }
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_unshift() {
        let mut buffer = ByteBuffer::with_capacity(4);
        buffer.push_u8(0x81);
        buffer.push_u16(0x0102);
        buffer.push_slice(b"hello");

        assert_eq!(buffer.as_bytes(), b"\x81\x01\x02hello");

        buffer.unshift(3);
        assert_eq!(buffer.as_bytes(), b"hello");
        assert_eq!(buffer.len(), 5);

        buffer.unshift(5);
        assert!(buffer.is_empty());
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut buffer = ByteBuffer::with_capacity(2);
        for i in 0..1000u32 {
            buffer.push_u8((i % 251) as u8);
        }
        assert_eq!(buffer.len(), 1000);
        assert!(buffer.capacity() >= 1000);
        assert_eq!(buffer.as_bytes()[999], (999 % 251) as u8);
    }

    #[test]
    fn reuses_capacity_after_clear() {
        let mut buffer = ByteBuffer::from(BytesMut::with_capacity(64));
        buffer.push_slice(&[1; 64]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 64);

        buffer.push_u64(u64::MAX);
        assert_eq!(buffer.into_inner().as_ref(), &[0xFF; 8]);
    }
}
