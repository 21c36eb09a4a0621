//! Tag-aware read cache with push-based invalidation.
//!
//! Entries are keyed by the path they render under (e.g. `/product/{slug}`)
//! and carry a set of tags. The revalidation webhook drops entries by path
//! or by tag so the next read goes back to the content store.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;

/// A cached value and the tags it was stored under.
#[derive(Debug, Clone)]
struct CachedRead<V> {
    value: V,
    tags: Arc<[String]>,
}

/// Read-through cache that the content webhook can invalidate.
#[derive(Clone)]
pub struct RevalidationCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, CachedRead<V>>,
    /// Bumped by every invalidation.
    invalidations: Arc<AtomicU64>,
}

impl<V> RevalidationCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache. Entries also expire after `ttl` as a safety net.
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        Self {
            cache,
            invalidations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached value for a path, if present.
    pub async fn get(&self, path: &str) -> Option<V> {
        self.cache.get(path).await.map(|entry| entry.value)
    }

    /// Store a value under a path and tags.
    pub async fn insert(&self, path: impl Into<String>, tags: &[String], value: V) {
        self.cache
            .insert(
                path.into(),
                CachedRead {
                    value,
                    tags: tags.into(),
                },
            )
            .await;
    }

    /// Return the cached value or load and cache it.
    ///
    /// `None` from the loader is passed through and not cached. Neither is a
    /// value whose load overlapped an invalidation, since it may predate the
    /// change that triggered it.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; nothing is cached in that case.
    pub async fn get_or_load<E, F, Fut>(
        &self,
        path: &str,
        tags: &[String],
        load: F,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if let Some(value) = self.get(path).await {
            tracing::debug!(path, "cache hit");
            return Ok(Some(value));
        }

        let seen = self.invalidations.load(Ordering::SeqCst);
        let loaded = load().await?;
        if let Some(value) = &loaded {
            if self.invalidations.load(Ordering::SeqCst) == seen {
                self.insert(path, tags, value.clone()).await;
            } else {
                tracing::debug!(path, "invalidated during load, not caching");
            }
        }
        Ok(loaded)
    }

    /// Drop the entry rendered under `path`.
    pub async fn invalidate_path(&self, path: &str) {
        tracing::info!(path, "revalidating path");
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(path).await;
    }

    /// Drop every entry carrying `tag`.
    pub fn invalidate_tag(&self, tag: &str) {
        tracing::info!(tag, "revalidating tag");
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        let tag = tag.to_string();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |_, entry| entry.tags.iter().any(|t| *t == tag))
        {
            tracing::error!(error = %e, "failed to register tag invalidation");
        }
    }
}
