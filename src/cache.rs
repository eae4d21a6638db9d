//! Time-to-live cache for remote call results.
//!
//! Entries are keyed by call signature: the operation name plus its ordered
//! arguments. The cache is agnostic of the time-to-live; every call site
//! passes its own, usually one of the tiers in [`ttl`].
//!
//! Both [`ResultCache::get_or_compute`] and [`ResultCache::clear`] take
//! `&mut self`. At most one computation is therefore in flight per cache,
//! and a clear can never interleave with a write.
//!
//! # Example
//!
//! ```ignore
//! let mut cache = ResultCache::new();
//! let key = CacheKey::new("search", ["cats", "video", ""]);
//! let page = cache
//!     .get_or_compute(key, ttl::TEN_MINUTES, || fetcher.fetch_page(&request, ""))
//!     .await?;
//! ```

use std::{collections::HashMap, fmt, future::Future, time::Duration};

use tokio::time::Instant;

use crate::error::Result;

/// Time-to-live tiers used by the listing routes.
pub mod ttl {
    use std::time::Duration;

    pub const FIVE_MINUTES: Duration = Duration::from_secs(5 * 60);
    pub const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);
    pub const ONE_HOUR: Duration = Duration::from_secs(60 * 60);
    pub const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);
}

/// Call signature identifying a cache entry.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    operation: String,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(operation: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation: operation.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.args.join(", "))
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    /// `None` when the time-to-live overflows the clock.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[derive(Debug)]
pub struct ResultCache<V> {
    entries: HashMap<CacheKey, Entry<V>>,
}

impl<V> Default for ResultCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> ResultCache<V>
where
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unexpired value stored for `key`, or runs `compute` once
    /// and stores its result for `ttl`.
    ///
    /// # Errors
    ///
    /// Propagates the error of `compute`. Failures are never cached and an
    /// existing entry for `key` is left as it was.
    pub async fn get_or_compute<F, Fut>(
        &mut self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired(Instant::now()) {
                debug!("cache hit: {key}");
                return Ok(entry.value.clone());
            }
        }

        debug!("cache miss: {key}");
        let value = compute().await?;

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries.insert(
            key,
            Entry {
                value: value.clone(),
                expires_at: now.checked_add(ttl),
            },
        );

        Ok(value)
    }

    /// Removes all entries unconditionally.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            debug!("clearing {} cached results", self.entries.len());
        }
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;

    fn key(page_token: &str) -> CacheKey {
        CacheKey::new("playlist_items", ["PL123", page_token])
    }

    async fn counted(calls: &AtomicUsize, value: u32) -> Result<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn computes_once_before_expiry() {
        let mut cache = ResultCache::new();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 1))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 2))
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recomputes_after_expiry() {
        let mut cache = ResultCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 1))
            .await
            .unwrap();
        tokio::time::advance(ttl::FIVE_MINUTES).await;
        let value = cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 2))
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_arguments_are_distinct_entries() {
        let mut cache = ResultCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(key(""), ttl::ONE_DAY, || counted(&calls, 1))
            .await
            .unwrap();
        let next = cache
            .get_or_compute(key("CAoQAA"), ttl::ONE_DAY, || counted(&calls, 2))
            .await
            .unwrap();

        assert_eq!(next, 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mut cache: ResultCache<u32> = ResultCache::new();
        let calls = AtomicUsize::new(0);

        let result = cache
            .get_or_compute(key(""), ttl::ONE_HOUR, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::unavailable("backend down"))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = cache
            .get_or_compute(key(""), ttl::ONE_HOUR, || counted(&calls, 7))
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_nothing_stale() {
        let mut cache: ResultCache<u32> = ResultCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 1))
            .await
            .unwrap();
        tokio::time::advance(ttl::ONE_HOUR).await;

        let result = cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || async {
                Err(Error::unavailable("backend down"))
            })
            .await;
        assert!(result.is_err());

        // The expired entry is not served, a new computation runs.
        let value = cache
            .get_or_compute(key(""), ttl::FIVE_MINUTES, || counted(&calls, 3))
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn clear_forces_recompute() {
        let mut cache = ResultCache::new();
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(key(""), ttl::ONE_DAY, || counted(&calls, 1))
            .await
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());

        let value = cache
            .get_or_compute(key(""), ttl::ONE_DAY, || counted(&calls, 2))
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
