//! Raster resource access.
//!
//! The statistics cache needs to read "the pixels of resource X inside bbox Y"
//! on a cache miss. That access goes through [`RasterSource`], which opens a
//! [`RasterReader`] for an identifier. The reader is closed when dropped, so
//! acquisition is scoped to the miss path.
//!
//! Real deployments back this with a COG/GeoTIFF reader; [`MemoryRasterSource`]
//! serves fully decoded rasters held in memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::IoError;

use super::geo::{BoundingBox, Window};
use super::tile::RasterTile;

/// Opens raster resources by identifier (URL, object key, path).
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Open the resource. The returned reader releases it on drop.
    async fn open(&self, identifier: &str) -> Result<Box<dyn RasterReader>, IoError>;
}

/// An opened raster resource.
#[async_trait]
pub trait RasterReader: Send + Sync {
    /// Read the pixels intersecting `bbox` (in the resource's CRS).
    async fn read_subset(&self, bbox: &BoundingBox) -> Result<RasterTile, IoError>;

    /// Identifier this reader was opened with (for logging).
    fn identifier(&self) -> &str;
}

// =============================================================================
// In-memory source
// =============================================================================

/// Slack used when snapping a bbox to pixel edges, so coordinates that land
/// on a pixel edge up to float noise do not pull in an extra row or column.
const PIXEL_EPSILON: f64 = 1e-9;

/// A [`RasterSource`] over fully decoded rasters held in memory.
#[derive(Default, Clone)]
pub struct MemoryRasterSource {
    rasters: Arc<RwLock<HashMap<String, Arc<RasterTile>>>>,
}

impl MemoryRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a raster under `identifier`.
    pub async fn insert(&self, identifier: impl Into<String>, raster: RasterTile) {
        self.rasters
            .write()
            .await
            .insert(identifier.into(), Arc::new(raster));
    }

    /// Number of registered rasters.
    pub async fn len(&self) -> usize {
        self.rasters.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rasters.read().await.is_empty()
    }
}

#[async_trait]
impl RasterSource for MemoryRasterSource {
    async fn open(&self, identifier: &str) -> Result<Box<dyn RasterReader>, IoError> {
        let raster = self
            .rasters
            .read()
            .await
            .get(identifier)
            .cloned()
            .ok_or_else(|| IoError::NotFound(identifier.to_string()))?;

        Ok(Box::new(MemoryRasterReader {
            identifier: identifier.to_string(),
            raster,
        }))
    }
}

/// Reader over one in-memory raster.
pub struct MemoryRasterReader {
    identifier: String,
    raster: Arc<RasterTile>,
}

impl MemoryRasterReader {
    /// The smallest pixel window covering `bbox`, clipped to the raster.
    fn covering_window(&self, bbox: &BoundingBox) -> Option<Window> {
        let inverse = self.raster.transform().inverse()?;

        let corners = [
            inverse.apply(bbox.left, bbox.top),
            inverse.apply(bbox.right, bbox.top),
            inverse.apply(bbox.left, bbox.bottom),
            inverse.apply(bbox.right, bbox.bottom),
        ];

        let (mut col_min, mut row_min) = (f64::INFINITY, f64::INFINITY);
        let (mut col_max, mut row_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (col, row) in corners {
            col_min = col_min.min(col);
            col_max = col_max.max(col);
            row_min = row_min.min(row);
            row_max = row_max.max(row);
        }

        let width = self.raster.width() as f64;
        let height = self.raster.height() as f64;

        let col_start = (col_min + PIXEL_EPSILON).floor().clamp(0.0, width);
        let col_end = (col_max - PIXEL_EPSILON).ceil().clamp(0.0, width);
        let row_start = (row_min + PIXEL_EPSILON).floor().clamp(0.0, height);
        let row_end = (row_max - PIXEL_EPSILON).ceil().clamp(0.0, height);

        if col_start >= col_end || row_start >= row_end {
            return None;
        }

        Some(Window::new(
            col_start as usize,
            row_start as usize,
            (col_end - col_start) as usize,
            (row_end - row_start) as usize,
        ))
    }
}

#[async_trait]
impl RasterReader for MemoryRasterReader {
    async fn read_subset(&self, bbox: &BoundingBox) -> Result<RasterTile, IoError> {
        let outside = || IoError::OutsideBounds {
            resource: self.identifier.clone(),
            bbox: bbox.to_string(),
        };

        if !bbox.intersects(self.raster.bounds()) {
            return Err(outside());
        }

        let window = self.covering_window(bbox).ok_or_else(outside)?;
        self.raster.window(&window).ok_or_else(outside)
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
