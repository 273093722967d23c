//! Test utilities for integration tests.
//!
//! This module provides a raster source that tracks `open` calls, fixture
//! tiles, and helpers to build processors around them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use ndarray::Array3;

use tiler_postprocess::error::IoError;
use tiler_postprocess::raster::{
    Affine, MemoryRasterSource, RasterReader, RasterSource, RasterTile, ValueRange,
};
use tiler_postprocess::stats::{ManualClock, StatsCache, DEFAULT_STATS_CACHE_ENTRIES};
use tiler_postprocess::{AlgorithmContext, AlgorithmRegistry, ColormapRegistry, TileProcessor};

/// Identifier of the raster registered by [`TrackingSource::with_heatmap`].
pub const HEATMAP_ASSET: &str = "s3://tiles/heatmap.tif";

// =============================================================================
// Tracking Raster Source
// =============================================================================

/// A raster source that counts `open` calls and can slow down or fail.
///
/// Clones share the counter and the underlying rasters.
#[derive(Clone, Default)]
pub struct TrackingSource {
    inner: MemoryRasterSource,
    opens: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl TrackingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding [`heatmap_raster`] under [`HEATMAP_ASSET`].
    pub async fn with_heatmap() -> Self {
        let source = Self::new();
        source.inner.insert(HEATMAP_ASSET, heatmap_raster()).await;
        source
    }

    /// Delay every `open` so concurrent misses overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn insert(&self, identifier: &str, raster: RasterTile) {
        self.inner.insert(identifier, raster).await;
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterSource for TrackingSource {
    async fn open(&self, identifier: &str) -> Result<Box<dyn RasterReader>, IoError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.open(identifier).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A 100x100 single-band raster over `[0, 0, 100, 100]` at one unit per pixel.
///
/// The lower-left quarter (`[0, 0, 50, 50]`) holds values in `[10, 20]`; the
/// rest holds values in `[0, 1000]`.
pub fn heatmap_raster() -> RasterTile {
    let data = Array3::from_shape_fn((1, 100, 100), |(_, r, c)| {
        if r >= 50 && c < 50 {
            10.0 + ((r - 50) * 50 + c) as f64 / 2499.0 * 10.0
        } else {
            ((r * 100 + c) % 1001) as f64
        }
    });
    RasterTile::new(data, Affine::from_origin(0.0, 100.0, 1.0, 1.0), "EPSG:3857")
}

/// A 2x2 request tile inside `[0, 0, 50, 50]` with one no-data pixel and
/// dataset statistics of `[0, 1000]`.
pub fn request_tile() -> RasterTile {
    let mut data = Array3::from_elem((1, 2, 2), 15.0);
    data[[0, 0, 0]] = 10.0;
    data[[0, 1, 1]] = f64::NAN;
    RasterTile::new(data, Affine::from_origin(0.0, 2.0, 1.0, 1.0), "EPSG:3857")
        .with_assets([HEATMAP_ASSET])
        .with_dataset_statistics(vec![ValueRange::new(0.0, 1000.0)])
}

/// A buffered single-band tile of `size` square pixels with values in
/// `[0, 100]`, at 10 units per pixel with its origin at `(1000, 20000)`.
pub fn buffered_tile(size: usize) -> RasterTile {
    let data = Array3::from_shape_fn((1, size, size), |(_, r, c)| ((r * 7 + c * 3) % 101) as f64);
    RasterTile::new(
        data,
        Affine::from_origin(1000.0, 20000.0, 10.0, 10.0),
        "EPSG:3857",
    )
}

// =============================================================================
// Processor Helpers
// =============================================================================

/// A statistics cache over `source` driven by `clock`.
pub fn stats_cache(source: TrackingSource, clock: Arc<ManualClock>) -> Arc<StatsCache> {
    Arc::new(StatsCache::with_options(
        Arc::new(source),
        clock,
        Duration::from_secs(60),
        DEFAULT_STATS_CACHE_ENTRIES,
    ))
}

/// A processor with the built-in algorithms and palettes sharing `cache`.
pub fn processor(cache: Arc<StatsCache>) -> TileProcessor {
    TileProcessor::new(
        AlgorithmRegistry::new(AlgorithmContext::new(cache)),
        ColormapRegistry::new(),
    )
}

/// A processor whose cache reads from an empty source.
pub fn default_processor() -> TileProcessor {
    processor(stats_cache(TrackingSource::new(), Arc::new(ManualClock::new())))
}

/// Decode PNG bytes.
pub fn decode_png(data: &[u8]) -> DynamicImage {
    image::load_from_memory_with_format(data, ImageFormat::Png).expect("valid PNG")
}
