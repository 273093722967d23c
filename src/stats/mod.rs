//! Statistics caching for bbox-scoped rescaling.
//!
//! - [`StatsCache`]: TTL + LRU cache of per-band min/max keyed by `(resource, bbox)`
//! - [`Clock`]: time source for expiry, with [`SystemClock`] and [`ManualClock`]

mod cache;
mod clock;

pub use cache::{
    BandStatistics, StatsCache, StatsCacheKey, DEFAULT_STATS_CACHE_ENTRIES, DEFAULT_STATS_TTL,
};
pub use clock::{Clock, ManualClock, SystemClock};
