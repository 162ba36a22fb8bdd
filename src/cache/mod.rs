//! Content cache with single-flight computation.
//!
//! [`ContentCache`] memoizes processed group output per [`CacheKey`] and
//! guarantees that concurrent misses on the same key coalesce onto one
//! in-flight computation: the first caller starts it, every concurrent
//! caller awaits a shared handle to the same future, and all of them receive
//! that computation's outcome, success or failure. An abandoned waiter does
//! not stop the in-flight computation; the remaining waiters still complete
//! and, on success, the entry is memoized for later hits.
//!
//! Invalidation bumps a generation counter besides clearing the memo table,
//! so a computation that started before the invalidation cannot re-populate
//! the table with stale content after it.
//!
//! Disabling the cache degrades [`get_or_compute`](ContentCache::get_or_compute)
//! to computing on every call with no cross-request memory, while a single
//! concurrent burst still coalesces through the in-flight table.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, trace};

use crate::core::{BundleError, Result};
use crate::model::ResourceType;

/// Identifies one unit of cacheable processed output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The group name.
    pub group: String,
    /// Which resource type of the group to bundle.
    pub kind: ResourceType,
    /// Whether minimize-aware transformers apply.
    pub minimize: bool,
}

impl CacheKey {
    /// Key for the given group, type and minimize flag.
    pub fn new(group: impl Into<String>, kind: ResourceType, minimize: bool) -> Self {
        Self {
            group: group.into(),
            kind,
            minimize,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[minimize={}]", self.group, self.kind, self.minimize)
    }
}

/// Fully merged, transformed output for one key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The processed content.
    pub content: String,
    /// When the computation finished.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(content: String) -> Self {
        Self {
            content,
            created_at: Utc::now(),
        }
    }
}

type ComputeOutcome = std::result::Result<Arc<CacheEntry>, BundleError>;
type Flight = Shared<BoxFuture<'static, ComputeOutcome>>;

struct CacheState {
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    in_flight: DashMap<CacheKey, Flight>,
    enabled: AtomicBool,
    generation: AtomicU64,
}

/// Memoizing, single-flight cache for processed group content.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ContentCache {
    state: Arc<CacheState>,
}

impl ContentCache {
    /// Cache in the given enabled state.
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Arc::new(CacheState {
                entries: DashMap::new(),
                in_flight: DashMap::new(),
                enabled: AtomicBool::new(enabled),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Return the memoized entry for `key`, or run `compute` to produce it.
    ///
    /// Concurrent callers for the same key share one computation; each
    /// receives the same success or the same failure. Nothing is memoized
    /// while the cache is disabled.
    pub async fn get_or_compute<F, Fut>(&self, key: &CacheKey, compute: F) -> ComputeOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        if self.is_enabled() {
            if let Some(entry) = self.state.entries.get(key) {
                trace!(%key, "cache hit");
                return Ok(entry.clone());
            }
        }

        let flight = match self.state.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                trace!(%key, "joining in-flight computation");
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                debug!(%key, "cache miss, computing");
                let state = Arc::clone(&self.state);
                let flight_key = key.clone();
                let started_at_generation = state.generation.load(Ordering::Acquire);
                let future = compute();
                let flight: Flight = async move {
                    let outcome = future.await.map(|content| Arc::new(CacheEntry::new(content)));
                    state.in_flight.remove(&flight_key);
                    if let Ok(entry) = &outcome {
                        let fresh =
                            state.generation.load(Ordering::Acquire) == started_at_generation;
                        if fresh && state.enabled.load(Ordering::Relaxed) {
                            state.entries.insert(flight_key, entry.clone());
                        }
                    }
                    outcome
                }
                .boxed()
                .shared();
                vacant.insert(flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Clear the whole memo table.
    ///
    /// In-flight computations complete for their waiters but will not be
    /// memoized.
    pub fn invalidate(&self) {
        debug!(entries = self.state.entries.len(), "invalidating cache");
        self.state.generation.fetch_add(1, Ordering::Release);
        self.state.entries.clear();
    }

    /// Clear a single entry.
    pub fn invalidate_key(&self, key: &CacheKey) {
        self.state.entries.remove(key);
    }

    /// Toggle caching. Disabling also clears the memo table.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.invalidate();
        }
    }

    /// Whether memoization is active.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::Relaxed)
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    /// Whether the memo table is empty.
    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn key() -> CacheKey {
        CacheKey::new("g", ResourceType::Script, true)
    }

    #[tokio::test]
    async fn hit_skips_compute() {
        let cache = ContentCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            let entry = cache
                .get_or_compute(&key(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("content".to_string())
                })
                .await
                .unwrap();
            assert_eq!(entry.content, "content");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_to_one_computation() {
        let cache = ContentCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&key(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("shared".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        let entries: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for entry in &entries {
            assert_eq!(entry.content, "shared");
            assert_eq!(entry.created_at, entries[0].created_at);
        }
    }

    #[tokio::test]
    async fn waiters_share_the_failure() {
        let cache = ContentCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&key(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Err(BundleError::GroupNotFound {
                            name: "g".to_string(),
                        })
                    })
                    .await
            }));
        }

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(matches!(outcome, Err(BundleError::GroupNotFound { .. })));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // failures are never memoized
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failure_is_retried_on_next_call() {
        let cache = ContentCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        for attempt in 0..2 {
            let calls = Arc::clone(&calls);
            let outcome = cache
                .get_or_compute(&key(), move || async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(BundleError::GroupNotFound {
                            name: "g".to_string(),
                        })
                    } else {
                        Ok("recovered".to_string())
                    }
                })
                .await;
            if attempt == 0 {
                assert!(outcome.is_err());
            } else {
                assert_eq!(outcome.unwrap().content, "recovered");
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_recompute() {
        let cache = ContentCache::new(true);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_compute(&key(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("v".to_string())
                })
                .await
                .unwrap();
            cache.invalidate();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_key_clears_only_that_entry() {
        let cache = ContentCache::new(true);
        let other = CacheKey::new("other", ResourceType::Style, false);

        cache
            .get_or_compute(&key(), || async { Ok("a".to_string()) })
            .await
            .unwrap();
        cache
            .get_or_compute(&other, || async { Ok("b".to_string()) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_key(&key());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn stale_computation_does_not_repopulate_after_invalidate() {
        let cache = ContentCache::new(true);

        let slow = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(&key(), || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("stale".to_string())
                    })
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate();

        let entry = slow.await.unwrap();
        assert_eq!(entry.content, "stale");
        // the entry that started before the invalidation is not memoized
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_recomputes_every_call() {
        let cache = ContentCache::new(false);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_compute(&key(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn disabled_cache_still_coalesces_a_burst() {
        let cache = ContentCache::new(false);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&key(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("burst".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }
        futures::future::join_all(handles).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }
}
