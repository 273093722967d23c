//! Decoded raster tiles.
//!
//! A [`RasterTile`] is the decoded input to the processing pipeline: a
//! `(band, row, col)` array of `f64` samples where `NaN` marks no-data, plus
//! its georeferencing. Algorithms never mutate it; they produce a new
//! [`ByteTile`] carrying byte data and a 0/255 validity mask.

use ndarray::{s, Array3, ArrayView2, Axis};

use crate::algorithm::MaskedBytes;

use super::geo::{Affine, BoundingBox, Window};

// =============================================================================
// Value Range
// =============================================================================

/// A `(min, max)` statistic pair for one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The displayable byte range `[0, 255]`.
    pub const BYTE: ValueRange = ValueRange::new(0.0, 255.0);

    /// Min/max over the values that are not `NaN`.
    ///
    /// Returns a `NaN` range when there is no valid value.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            seen = true;
        }
        if seen {
            Self::new(min, max)
        } else {
            Self::new(f64::NAN, f64::NAN)
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// A usable rescale source: finite with `min < max`.
    pub fn is_proper(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

impl From<(f64, f64)> for ValueRange {
    fn from((min, max): (f64, f64)) -> Self {
        Self::new(min, max)
    }
}

// =============================================================================
// Raster Tile
// =============================================================================

/// A decoded, georeferenced multi-band tile.
#[derive(Debug, Clone)]
pub struct RasterTile {
    data: Array3<f64>,
    transform: Affine,
    bounds: BoundingBox,
    crs: String,
    assets: Vec<String>,
    dataset_statistics: Option<Vec<ValueRange>>,
}

impl RasterTile {
    /// Create a tile; bounds are derived from the transform and array shape.
    pub fn new(data: Array3<f64>, transform: Affine, crs: impl Into<String>) -> Self {
        let (_, height, width) = data.dim();
        let bounds = transform.window_bounds(&Window::new(0, 0, width, height));
        Self {
            data,
            transform,
            bounds,
            crs: crs.into(),
            assets: Vec::new(),
            dataset_statistics: None,
        }
    }

    /// Attach the source asset identifiers (first one is the primary source).
    pub fn with_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Attach the whole-dataset statistics provided by the reader.
    pub fn with_dataset_statistics(mut self, statistics: Vec<ValueRange>) -> Self {
        self.dataset_statistics = Some(statistics);
        self
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// One band as a `(row, col)` view.
    ///
    /// # Panics
    /// Panics if `index >= self.count()`.
    pub fn band(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    /// Number of bands.
    pub fn count(&self) -> usize {
        self.data.dim().0
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn transform(&self) -> &Affine {
        &self.transform
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Whole-dataset statistics, if the reader supplied them.
    pub fn dataset_statistics(&self) -> Option<&[ValueRange]> {
        self.dataset_statistics.as_deref()
    }

    /// Per-band min/max over this tile's valid pixels.
    pub fn statistics(&self) -> Vec<ValueRange> {
        self.data
            .axis_iter(Axis(0))
            .map(|band| ValueRange::of(band.iter().copied()))
            .collect()
    }

    /// Extract a pixel window as a new tile with its own transform and bounds.
    ///
    /// Returns `None` if the window does not fit inside this tile.
    pub fn window(&self, window: &Window) -> Option<RasterTile> {
        if window.row_end() > self.height() || window.col_end() > self.width() {
            return None;
        }
        let data = self
            .data
            .slice(s![
                ..,
                window.row_off..window.row_end(),
                window.col_off..window.col_end()
            ])
            .to_owned();
        let transform = self
            .transform
            .translated(window.col_off as f64, window.row_off as f64);

        Some(RasterTile {
            data,
            transform,
            bounds: self.transform.window_bounds(window),
            crs: self.crs.clone(),
            assets: self.assets.clone(),
            dataset_statistics: self.dataset_statistics.clone(),
        })
    }
}

// =============================================================================
// Byte Tile
// =============================================================================

/// Renderable output of an algorithm: `u8` data plus a 0/255 mask
/// (0 = valid, 255 = no-data), always of identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteTile {
    data: Array3<u8>,
    mask: Array3<u8>,
    transform: Affine,
    bounds: BoundingBox,
    crs: String,
    assets: Vec<String>,
}

impl ByteTile {
    /// Wrap masked output, inheriting georeferencing from `source`.
    pub fn from_masked(masked: MaskedBytes, source: &RasterTile) -> Self {
        let (data, mask) = masked.into_parts();
        Self {
            data,
            mask,
            transform: source.transform,
            bounds: source.bounds,
            crs: source.crs.clone(),
            assets: source.assets.clone(),
        }
    }

    /// Replace the georeferencing (used when an algorithm crops the tile).
    pub fn with_geometry(mut self, transform: Affine, bounds: BoundingBox) -> Self {
        self.transform = transform;
        self.bounds = bounds;
        self
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    pub fn mask(&self) -> &Array3<u8> {
        &self.mask
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, u8> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn count(&self) -> usize {
        self.data.dim().0
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn transform(&self) -> &Affine {
        &self.transform
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Whether the pixel at `(row, col)` of the first band holds data.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask[[0, row, col]] == 0
    }
}
