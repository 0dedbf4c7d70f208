//! Object pool for ingestion contexts.
//!
//! The free list grows without bound; it is pre-warmed to a floor so the
//! first documents do not pay for allocation. Released objects are reset
//! before they are made available again.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::context::AddDocumentCtx;

type AllocFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type ResetFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects ever allocated by the pool
    pub allocated: usize,
    /// Objects currently on the free list
    pub idle: usize,
}

/// A thread-safe free list of boxed objects.
pub struct ObjectPool<T> {
    free: Mutex<Vec<Box<T>>>,
    allocated: AtomicUsize,
    alloc: AllocFn<T>,
    reset: ResetFn<T>,
}

impl<T> ObjectPool<T> {
    /// Create a pool holding `floor` pre-allocated objects.
    pub fn new<A, R>(floor: usize, alloc: A, reset: R) -> Self
    where
        A: Fn() -> T + Send + Sync + 'static,
        R: Fn(&mut T) + Send + Sync + 'static,
    {
        let free: Vec<Box<T>> = (0..floor).map(|_| Box::new(alloc())).collect();
        Self {
            free: Mutex::new(free),
            allocated: AtomicUsize::new(floor),
            alloc: Box::new(alloc),
            reset: Box::new(reset),
        }
    }

    /// Take an object off the free list, allocating if it is empty.
    pub fn acquire(&self) -> Box<T> {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match reused {
            Some(obj) => obj,
            None => {
                let total = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(total, "Pool allocating new object");
                Box::new((self.alloc)())
            }
        }
    }

    /// Reset an object and return it to the free list.
    pub fn release(&self, mut obj: Box<T>) {
        (self.reset)(&mut obj);
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(obj);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            idle: self
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Pool of ingestion contexts.
pub type ContextPool = ObjectPool<AddDocumentCtx>;

impl ContextPool {
    /// Default number of contexts allocated up front.
    pub const DEFAULT_FLOOR: usize = 16;

    pub fn with_floor(floor: usize) -> Self {
        ObjectPool::new(floor, AddDocumentCtx::new, AddDocumentCtx::reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn counting_pool(floor: usize) -> ObjectPool<Vec<u32>> {
        ObjectPool::new(floor, Vec::new, |v: &mut Vec<u32>| v.clear())
    }

    #[test]
    fn test_prewarmed_floor() {
        let pool = counting_pool(16);
        assert_eq!(pool.stats(), PoolStats { allocated: 16, idle: 16 });

        let obj = pool.acquire();
        assert_eq!(pool.stats(), PoolStats { allocated: 16, idle: 15 });
        pool.release(obj);
        assert_eq!(pool.stats().idle, 16);
    }

    #[test]
    fn test_growth_bounded_by_live_objects() {
        let pool = counting_pool(0);
        let live: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        assert_eq!(pool.stats().allocated, 5);
        live.into_iter().for_each(|obj| pool.release(obj));

        let again: Vec<_> = (0..6).map(|_| pool.acquire()).collect();
        assert_eq!(pool.stats().allocated, 6);
        assert_eq!(pool.stats().idle, 0);
        drop(again);
    }

    #[test]
    fn test_release_resets() {
        let pool = counting_pool(0);
        let mut obj = pool.acquire();
        obj.extend([1, 2, 3]);
        let cap = obj.capacity();
        pool.release(obj);

        let obj = pool.acquire();
        assert!(obj.is_empty());
        assert_eq!(obj.capacity(), cap);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(counting_pool(2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let obj = pool.acquire();
                        pool.release(obj);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = pool.stats();
        assert!(stats.allocated <= 8 + 2);
        assert_eq!(stats.idle, stats.allocated);
    }

    #[test]
    fn test_context_pool() {
        let pool = ContextPool::with_floor(ContextPool::DEFAULT_FLOOR);
        assert_eq!(pool.stats().allocated, 16);
        let ctx = pool.acquire();
        assert!(ctx.status().is_ok());
        pool.release(ctx);
    }
}
