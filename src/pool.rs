//! # Buffer Pool
//!
//! Each execution context owns one [`BufferPool`]: a key buffer and a value
//! buffer that are reused across encode calls. Pools are handed around by
//! `&mut`, so no locking is needed.
//!
//! [`PoolCache`] keeps idle pools in a bounded lock-free queue so that short
//! lived contexts (one request, one task) can reuse warm buffers.

use crate::buffer::NativeBuffer;
use crate::config::Options;
use crate::memory::Backend;
use crate::Result;
use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-context pair of reusable buffers.
#[derive(Debug)]
pub struct BufferPool {
    backend: Backend,
    options: Options,
    key: Option<NativeBuffer>,
    value: Option<NativeBuffer>,
}

impl BufferPool {
    /// Creates a pool; no memory is allocated until a buffer is requested.
    pub fn new(backend: Backend, options: Options) -> Self {
        Self { backend, options, key: None, value: None }
    }

    /// Returns the key buffer, creating it on first use.
    pub fn key_buffer(&mut self) -> &mut NativeBuffer {
        let (backend, options) = (&self.backend, &self.options);
        self.key.get_or_insert_with(|| NativeBuffer::with_options(backend.clone(), options))
    }

    /// Returns the value buffer, creating it on first use.
    pub fn value_buffer(&mut self) -> &mut NativeBuffer {
        let (backend, options) = (&self.backend, &self.options);
        self.value.get_or_insert_with(|| NativeBuffer::with_options(backend.clone(), options))
    }

    /// Returns both buffers at once.
    pub fn buffers(&mut self) -> (&mut NativeBuffer, &mut NativeBuffer) {
        let (backend, options) = (&self.backend, &self.options);
        let key = self.key.get_or_insert_with(|| NativeBuffer::with_options(backend.clone(), options));
        let value =
            self.value.get_or_insert_with(|| NativeBuffer::with_options(backend.clone(), options));
        (key, value)
    }

    /// Returns true if either buffer has been created.
    pub fn is_bound(&self) -> bool {
        self.key.is_some() || self.value.is_some()
    }

    /// Clears both buffers, shrinking oversized ones.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(key) = self.key.as_mut() {
            key.clear(true)?;
        }
        if let Some(value) = self.value.as_mut() {
            value.clear(true)?;
        }
        Ok(())
    }

    /// Destroys both buffers and unbinds them from this pool.
    pub fn teardown(&mut self) {
        if let Some(mut key) = self.key.take() {
            key.destroy();
        }
        if let Some(mut value) = self.value.take() {
            value.destroy();
        }
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Pool cache hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolCacheStats {
    /// Checkouts served from an idle pool.
    pub hits: u64,
    /// Checkouts that had to build a new pool.
    pub misses: u64,
}

/// Bounded cache of idle buffer pools.
#[derive(Debug)]
pub struct PoolCache {
    backend: Backend,
    options: Options,
    idle: ArrayQueue<BufferPool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PoolCache {
    /// Creates a cache that keeps up to `options.pool_cache_size` idle pools.
    pub fn new(backend: Backend, options: Options) -> Self {
        let capacity = options.pool_cache_size.max(1);
        Self {
            backend,
            options,
            idle: ArrayQueue::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Takes an idle pool or builds a new one.
    pub fn checkout(&self) -> PooledContext<'_> {
        let pool = match self.idle.pop() {
            Some(pool) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                pool
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("Pool cache miss, creating new buffer pool");
                BufferPool::new(self.backend.clone(), self.options.clone())
            }
        };
        PooledContext { cache: self, pool: Some(pool) }
    }

    /// Number of idle pools waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> PoolCacheStats {
        PoolCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn give_back(&self, mut pool: BufferPool) {
        if pool.reset().is_err() {
            pool.teardown();
            return;
        }
        if let Err(mut rejected) = self.idle.push(pool) {
            log::debug!("Pool cache full, tearing down buffer pool");
            rejected.teardown();
        }
    }
}

/// A checked-out pool; returned to its cache on drop.
#[derive(Debug)]
pub struct PooledContext<'a> {
    cache: &'a PoolCache,
    pool: Option<BufferPool>,
}

impl Deref for PooledContext<'_> {
    type Target = BufferPool;

    fn deref(&self) -> &BufferPool {
        match self.pool.as_ref() {
            Some(pool) => pool,
            None => unreachable!("pool is only taken on drop"),
        }
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut BufferPool {
        match self.pool.as_mut() {
            Some(pool) => pool,
            None => unreachable!("pool is only taken on drop"),
        }
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            self.cache.give_back(pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use crate::memory::select_backend;

    fn pool() -> BufferPool {
        BufferPool::new(select_backend(BackendKind::Direct), Options::default())
    }

    #[test]
    fn test_lazy_creation() {
        let mut pool = pool();
        assert!(!pool.is_bound());
        pool.key_buffer().append_slice(b"k").unwrap();
        assert!(pool.is_bound());
        assert_eq!(pool.key_buffer().as_slice(), b"k");
        assert!(pool.value_buffer().is_empty());
    }

    #[test]
    fn test_buffers_are_disjoint() {
        let mut pool = pool();
        let (key, value) = pool.buffers();
        key.append_slice(b"key").unwrap();
        value.append_slice(b"value").unwrap();
        assert_ne!(key.address(), value.address());
        assert_eq!(pool.key_buffer().as_slice(), b"key");
        assert_eq!(pool.value_buffer().as_slice(), b"value");
    }

    #[test]
    fn test_teardown_unbinds() {
        let mut pool = pool();
        pool.key_buffer().append_slice(b"x").unwrap();
        pool.teardown();
        assert!(!pool.is_bound());
        pool.teardown();

        assert!(pool.key_buffer().is_empty());
    }

    #[test]
    fn test_cache_reuses_pools() {
        let cache = PoolCache::new(select_backend(BackendKind::Native), Options::default());
        {
            let mut ctx = cache.checkout();
            ctx.value_buffer().append_slice(&[7u8; 20_000]).unwrap();
        }
        assert_eq!(cache.idle(), 1);

        let mut ctx = cache.checkout();
        let value = ctx.value_buffer();
        assert!(value.is_empty());
        assert_eq!(value.capacity(), Options::default().shrink_threshold);
        assert_eq!(cache.stats(), PoolCacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_cache_is_bounded() {
        let cache = PoolCache::new(
            select_backend(BackendKind::Direct),
            Options::default().pool_cache_size(1),
        );
        let a = cache.checkout();
        let b = cache.checkout();
        drop(a);
        drop(b);
        assert_eq!(cache.idle(), 1);
    }
}
