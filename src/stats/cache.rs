//! Bounding-box statistics cache.
//!
//! Low-zoom tiles rescale with the statistics of a wider source bbox instead
//! of their own pixels. Computing those means opening the source and reading
//! the bbox, so results are cached per `(resource, bbox)` for a fixed TTL.
//!
//! # Expiry
//!
//! An entry is fresh while `now - inserted < ttl`. Expired entries are
//! dropped lazily on the next lookup, which then recomputes. The cache is
//! additionally LRU-bounded by entry count.
//!
//! # In-flight guard
//!
//! Concurrent misses for one key share a single read: the first caller
//! computes, later callers wait for its result. Failures are handed to the
//! waiters but never cached.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::{Notify, RwLock};
use tracing::debug;

use crate::error::IoError;
use crate::raster::{BoundingBox, RasterSource, ValueRange};

use super::clock::{Clock, SystemClock};

/// Default time-to-live for cached statistics.
pub const DEFAULT_STATS_TTL: Duration = Duration::from_secs(60);

/// Default maximum number of cached `(resource, bbox)` entries.
pub const DEFAULT_STATS_CACHE_ENTRIES: usize = 10_000;

/// Per-band statistics shared between the cache and its callers.
pub type BandStatistics = Arc<[ValueRange]>;

type StatsResult = Result<BandStatistics, IoError>;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key: resource identifier plus the exact bbox.
///
/// The bbox is stored as raw bit patterns so the key is `Eq + Hash`; two
/// bboxes are the same key only if every coordinate is bit-identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatsCacheKey {
    /// Resource identifier (URL, object key)
    pub resource: Arc<str>,

    bbox: [u64; 4],
}

impl StatsCacheKey {
    pub fn new(resource: impl Into<Arc<str>>, bbox: &BoundingBox) -> Self {
        Self {
            resource: resource.into(),
            bbox: bbox.to_array().map(f64::to_bits),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_array(self.bbox.map(f64::from_bits))
    }
}

// =============================================================================
// Stats Cache
// =============================================================================

struct CacheEntry {
    statistics: BandStatistics,
    inserted: Instant,
}

/// State for an in-flight computation.
struct InFlightState {
    notify: Notify,
    result: Mutex<Option<StatsResult>>,
}

/// TTL cache of per-band min/max keyed by `(resource, bbox)`.
pub struct StatsCache {
    source: Arc<dyn RasterSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: RwLock<LruCache<StatsCacheKey, CacheEntry>>,
    in_flight: Mutex<HashMap<StatsCacheKey, Arc<InFlightState>>>,
}

impl StatsCache {
    /// Create a cache with the default TTL (60s) and capacity.
    pub fn new(source: Arc<dyn RasterSource>) -> Self {
        Self::with_options(
            source,
            Arc::new(SystemClock),
            DEFAULT_STATS_TTL,
            DEFAULT_STATS_CACHE_ENTRIES,
        )
    }

    /// Create a cache with an explicit clock, TTL and entry bound.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_options(
        source: Arc<dyn RasterSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            source,
            clock,
            ttl,
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN),
            )),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return cached statistics for `(resource, bbox)`, computing them on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the I/O error if the resource cannot be opened or read.
    /// Nothing is cached in that case.
    pub async fn get_or_compute(
        &self,
        resource: &str,
        bbox: &BoundingBox,
    ) -> Result<BandStatistics, IoError> {
        let key = StatsCacheKey::new(resource, bbox);

        if let Some(statistics) = self.get(&key).await {
            debug!(resource, %bbox, "bbox statistics cache hit");
            return Ok(statistics);
        }

        loop {
            let (state, leader) = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
                match in_flight.get(&key) {
                    Some(state) => (state.clone(), false),
                    None => {
                        let state = Arc::new(InFlightState {
                            notify: Notify::new(),
                            result: Mutex::new(None),
                        });
                        in_flight.insert(key.clone(), state.clone());
                        (state, true)
                    }
                }
            };

            if leader {
                return self.lead(key, state).await;
            }

            // Register interest before checking, so a notify between the
            // check and the await is not lost.
            let notified = state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = Self::take_result(&state) {
                return result;
            }
            notified.await;
            if let Some(result) = Self::take_result(&state) {
                return result;
            }
            // The leader was cancelled before producing a result; retry.
        }
    }

    /// Compute as the in-flight leader for `key`.
    async fn lead(&self, key: StatsCacheKey, state: Arc<InFlightState>) -> StatsResult {
        let guard = InFlightGuard {
            cache: self,
            key: &key,
            state: &state,
        };

        debug!(resource = %key.resource, bbox = %key.bbox(), "bbox statistics cache miss");
        let result = self.compute(&key).await;

        if let Ok(ref statistics) = result {
            let mut cache = self.cache.write().await;
            cache.put(
                key.clone(),
                CacheEntry {
                    statistics: statistics.clone(),
                    inserted: self.clock.now(),
                },
            );
        }

        *state.result.lock().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
        drop(guard);
        result
    }

    fn take_result(state: &InFlightState) -> Option<StatsResult> {
        state
            .result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Open the resource, read the bbox and compute per-band min/max.
    async fn compute(&self, key: &StatsCacheKey) -> StatsResult {
        let reader = self.source.open(&key.resource).await?;
        let subset = reader.read_subset(&key.bbox()).await?;
        Ok(subset.statistics().into())
    }

    /// Fresh cached statistics for `key`, evicting the entry if it expired.
    pub async fn get(&self, key: &StatsCacheKey) -> Option<BandStatistics> {
        let now = self.clock.now();
        let mut cache = self.cache.write().await;

        let expired = match cache.get(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted) < self.ttl => {
                return Some(entry.statistics.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            cache.pop(key);
        }
        None
    }

    /// Drop the entry for `(resource, bbox)`.
    pub async fn invalidate(&self, resource: &str, bbox: &BoundingBox) {
        let mut cache = self.cache.write().await;
        cache.pop(&StatsCacheKey::new(resource, bbox));
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Number of stored entries (expired ones included until looked up).
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}

/// Removes the in-flight marker and wakes waiters when the leader finishes
/// or is dropped mid-computation.
struct InFlightGuard<'a> {
    cache: &'a StatsCache,
    key: &'a StatsCacheKey,
    state: &'a InFlightState,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self
            .cache
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        in_flight.remove(self.key);
        drop(in_flight);
        self.state.notify.notify_waiters();
    }
}

// =============================================================================
// Tests
// =============================================================================
