//! Object pool shared by all worker threads.
//!
//! Connections take their input and output buffers from a [`BufferPool`] when they
//! are accepted and give them back when they close, so steady-state traffic does
//! not allocate buffers.
//!
//! The pool never shrinks and never blocks: [`Pool::take`] falls back to the factory
//! when no idle item is available.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::BytesMut;
use crossbeam_queue::SegQueue;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A lock-free pool of reusable items.
///
/// Concurrent `take` and `give` calls never lose or duplicate an item. Callers are
/// responsible for resetting an item before giving it back.
pub struct Pool<T> {
    factory: Factory<T>,
    idle: SegQueue<T>,
    allocated: AtomicUsize,
}

impl<T> Pool<T> {
    /// Creates an empty pool creating new items with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self { factory: Box::new(factory), idle: SegQueue::new(), allocated: AtomicUsize::new(0) }
    }

    /// Takes an idle item, or creates a new one when the pool is empty.
    pub fn take(&self) -> T {
        self.idle.pop().unwrap_or_else(|| {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            (self.factory)()
        })
    }

    /// Returns an item to the pool.
    pub fn give(&self, item: T) {
        self.idle.push(item);
    }

    /// Number of items currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Number of items the factory created so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

/// Pool of connection buffers holding `buffer_size` bytes each.
#[derive(Debug)]
pub struct BufferPool {
    pool: Pool<BytesMut>,
    buffer_size: usize,
}

impl BufferPool {
    /// Creates a pool of buffers holding `buffer_size` bytes each.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { pool: Pool::new(move || BytesMut::with_capacity(buffer_size)), buffer_size }
    }

    /// Takes an empty buffer able to hold `buffer_size` bytes without reallocating.
    ///
    /// A buffer that had bytes split off while it was in use gets its full capacity
    /// reserved again.
    pub fn take(&self) -> BytesMut {
        let mut buffer = self.pool.take();
        buffer.clear();
        buffer.reserve(self.buffer_size);
        buffer
    }

    /// Returns a buffer to the pool.
    pub fn give(&self, buffer: BytesMut) {
        self.pool.give(buffer);
    }

    /// Capacity of the buffers handed out by this pool.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of buffers currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.pool.idle()
    }

    /// Number of buffers created so far.
    pub fn allocated(&self) -> usize {
        self.pool.allocated()
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("idle", &self.idle()).field("allocated", &self.allocated()).finish()
    }
}
