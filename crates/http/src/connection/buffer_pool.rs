use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::protocol::ByteBuffer;

/// Reusable outbound frame buffers of one session.
///
/// Buffers are created on demand when the pool is empty and are handed back after
/// every write. The pool is unbounded and never shrinks; under steady load it settles
/// at the number of frames in flight.
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    free: Mutex<Vec<ByteBuffer>>,
    created: AtomicUsize,
}

impl BufferPool {
    /// An empty pool whose buffers start with `buffer_size` bytes of capacity.
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size, free: Mutex::new(Vec::new()), created: AtomicUsize::new(0) }
    }

    /// Takes an empty buffer, allocating one if none is free.
    pub fn acquire(&self) -> ByteBuffer {
        if let Some(buffer) = self.free.lock().pop() {
            return buffer;
        }

        let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(buffer_size = self.buffer_size, created, "create outbound buffer");
        ByteBuffer::with_capacity(self.buffer_size)
    }

    /// Clears `buffer` and keeps it for the next [`BufferPool::acquire`].
    pub fn release(&self, mut buffer: ByteBuffer) {
        buffer.clear();
        self.free.lock().push(buffer);
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of buffers allocated over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of buffers currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_released_buffers() {
        let pool = BufferPool::new(64);

        let mut first = pool.acquire();
        first.push_slice(b"frame");
        let second = pool.acquire();
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.available(), 0);

        pool.release(first);
        pool.release(second);
        assert_eq!(pool.available(), 2);

        let reused = pool.acquire();
        assert!(reused.is_empty());
        assert!(reused.capacity() >= 64);
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.available(), 1);
    }
}
