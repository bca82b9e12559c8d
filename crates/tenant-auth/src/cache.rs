//! Single-slot cache that recomputes its value lazily when absent or expired.
//!
//! The two hooks a concrete use site needs (expiry test and recomputation) are
//! supplied through the [`ValueSource`] strategy trait rather than by
//! subclassing the cache.
//!
//! # Behavior
//!
//! - `get_value` returns the stored value unless none exists yet or the source
//!   reports it expired, in which case `compute_new` runs and its result
//!   replaces the slot wholesale.
//! - A failed `compute_new` leaves the previous value in place and surfaces the
//!   error; stale values are never returned as a fallback.
//! - Refresh is pull-based. Nothing runs in the background.
//!
//! # Concurrency
//!
//! The slot is guarded by an async mutex held across `compute_new`, so
//! concurrent callers of one cache wait for a single in-flight refresh instead
//! of each issuing their own.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;

/// Strategy supplying the expiry test and recomputation for a cache.
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Cached value type. Cloned out of the cache on every read.
    type Value: Clone + Send + Sync;

    /// Error produced when a new value cannot be computed.
    type Error: Send;

    /// Whether `value` must be recomputed before use.
    fn is_expired(&self, value: &Self::Value) -> bool;

    /// Produce a fresh value.
    async fn compute_new(&self) -> Result<Self::Value, Self::Error>;
}

/// Lazily refreshed single-slot cache over a [`ValueSource`].
pub struct ExpiringValueCache<S: ValueSource> {
    source: S,
    slot: Mutex<Option<S::Value>>,
}

impl<S: ValueSource> ExpiringValueCache<S> {
    /// Create an empty cache. Nothing is computed until first use.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            slot: Mutex::new(None),
        }
    }

    /// The strategy backing this cache.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the cached value, recomputing it first if absent or expired.
    ///
    /// # Errors
    ///
    /// Propagates the source's error when recomputation fails. The previously
    /// cached value, if any, is kept.
    pub async fn get_value(&self) -> Result<S::Value, S::Error> {
        let mut slot = self.slot.lock().await;

        if let Some(current) = slot.as_ref() {
            if !self.source.is_expired(current) {
                trace!(target: "tenant_auth.cache", "Serving cached value");
                return Ok(current.clone());
            }
        }

        let fresh = self.source.compute_new().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// The stored value, without checking expiry or recomputing.
    pub async fn peek(&self) -> Option<S::Value> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
    use std::sync::Arc;

    /// Value that expires at a fixed instant on a shared fake clock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Stamped {
        serial: u32,
        expires_at: i64,
    }

    struct ClockedSource {
        now: Arc<AtomicI64>,
        lifetime: i64,
        margin: i64,
        calls: AtomicU32,
        fail: AtomicBool,
    }

    impl ClockedSource {
        fn new(now: Arc<AtomicI64>, lifetime: i64) -> Self {
            Self {
                now,
                lifetime,
                margin: 5,
                calls: AtomicU32::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl ValueSource for ClockedSource {
        type Value = Stamped;
        type Error = String;

        fn is_expired(&self, value: &Stamped) -> bool {
            value.expires_at - self.now.load(Ordering::SeqCst) <= self.margin
        }

        async fn compute_new(&self) -> Result<Stamped, String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("source unavailable".to_string());
            }
            let serial = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Stamped {
                serial,
                expires_at: self.now.load(Ordering::SeqCst) + self.lifetime,
            })
        }
    }

    #[tokio::test]
    async fn test_first_read_computes() {
        let clock = Arc::new(AtomicI64::new(1_000));
        let cache = ExpiringValueCache::new(ClockedSource::new(clock, 60));

        assert!(cache.peek().await.is_none());

        let value = cache.get_value().await.unwrap();
        assert_eq!(value.serial, 0);
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek().await, Some(value));
    }

    #[tokio::test]
    async fn test_fresh_value_is_reused_until_margin() {
        // Value expires at T = 1060. Reads at T-10 hit the cache, T-1 refreshes.
        let clock = Arc::new(AtomicI64::new(1_000));
        let cache = ExpiringValueCache::new(ClockedSource::new(clock.clone(), 60));

        let first = cache.get_value().await.unwrap();

        clock.store(1_050, Ordering::SeqCst);
        let second = cache.get_value().await.unwrap();
        let third = cache.get_value().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);

        clock.store(1_059, Ordering::SeqCst);
        let refreshed = cache.get_value().await.unwrap();
        assert_ne!(refreshed, first);
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_value() {
        let clock = Arc::new(AtomicI64::new(1_000));
        let cache = ExpiringValueCache::new(ClockedSource::new(clock.clone(), 60));

        let first = cache.get_value().await.unwrap();

        clock.store(2_000, Ordering::SeqCst);
        cache.source().fail.store(true, Ordering::SeqCst);

        let err = cache.get_value().await.unwrap_err();
        assert_eq!(err, "source unavailable");
        assert_eq!(cache.peek().await, Some(first));

        // Next read after recovery refreshes normally
        cache.source().fail.store(false, Ordering::SeqCst);
        let recovered = cache.get_value().await.unwrap();
        assert_eq!(recovered.serial, 1);
    }

    #[tokio::test]
    async fn test_failed_first_compute_leaves_slot_empty() {
        let clock = Arc::new(AtomicI64::new(1_000));
        let source = ClockedSource::new(clock, 60);
        source.fail.store(true, Ordering::SeqCst);
        let cache = ExpiringValueCache::new(source);

        assert!(cache.get_value().await.is_err());
        assert!(cache.peek().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_readers_share_one_refresh() {
        let clock = Arc::new(AtomicI64::new(1_000));
        let cache = Arc::new(ExpiringValueCache::new(ClockedSource::new(clock, 60)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_value().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().serial, 0);
        }

        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
    }
}
