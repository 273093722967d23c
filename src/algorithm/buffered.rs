//! Buffered contrast algorithms.
//!
//! Both algorithms expect the caller to fetch `buffer` extra pixels on every
//! side of the tile, compute their statistics over the enlarged area so that
//! neighboring tiles equalize consistently, and return only the central
//! `tilesize` square.

use async_trait::async_trait;
use ndarray::{s, Axis};
use serde::Deserialize;
use serde_json::json;
use tracing::trace;

use crate::error::AlgorithmError;
use crate::raster::{ByteTile, RasterTile, ValueRange, Window};

use super::equalize::{equalize_histogram, normalize_min_max, Clahe};
use super::mask::{MaskedBytes, NoDataMask};
use super::rescale::rescale_band;
use super::{first_band, Algorithm, AlgorithmInfo};

/// Default buffer on each side, in pixels.
pub const DEFAULT_BUFFER: usize = 512;

/// Default output tile edge, in pixels.
pub const DEFAULT_TILESIZE: usize = 256;

/// Clip limit used by [`StravaClahe`].
pub const CLAHE_CLIP_LIMIT: f64 = 1.0;

/// Tiles per axis used by [`StravaClahe`].
pub const CLAHE_GRID: usize = 3;

/// Upper bound of the min/max stretch ahead of CLAHE; saturates to 255.
const NORMALIZE_BETA: f64 = 256.0;

// =============================================================================
// Parameters
// =============================================================================

/// Buffer geometry shared by the buffered algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BufferParams {
    /// Extra pixels fetched on each side of the tile
    pub buffer: usize,

    /// Edge of the square output tile
    pub tilesize: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
            tilesize: DEFAULT_TILESIZE,
        }
    }
}

impl BufferParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.tilesize == 0 {
            return Err("tilesize must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Minimum input edge: `buffer * 2 + tilesize`.
    pub fn required_size(&self) -> usize {
        self.buffer * 2 + self.tilesize
    }

    /// The central output window of `tile`, checking the input is large
    /// enough to contain it.
    pub fn central_window(&self, tile: &RasterTile) -> Result<Window, AlgorithmError> {
        let required = self.required_size();
        if tile.height() < required || tile.width() < required {
            return Err(AlgorithmError::BufferTooSmall {
                required,
                height: tile.height(),
                width: tile.width(),
            });
        }
        Ok(Window::centered(self.buffer, self.tilesize))
    }

    fn schema() -> serde_json::Value {
        json!({
            "buffer": { "type": "integer", "minimum": 0, "default": DEFAULT_BUFFER },
            "tilesize": { "type": "integer", "minimum": 1, "default": DEFAULT_TILESIZE },
        })
    }

    fn into_algorithm<A>(
        self,
        name: &str,
        build: impl FnOnce(BufferParams) -> A,
    ) -> Result<A, AlgorithmError> {
        self.validate()
            .map_err(|message| AlgorithmError::InvalidParameters {
                algorithm: name.to_string(),
                message,
            })?;
        Ok(build(self))
    }
}

/// Wrap cropped output with the geometry of `window` within `source`.
fn crop_output(
    source: &RasterTile,
    window: &Window,
    buffer: usize,
    masked: MaskedBytes,
) -> ByteTile {
    let transform = source.transform();
    let bounds = transform.window_bounds(window);
    let shifted = transform.translated(buffer as f64, buffer as f64);
    ByteTile::from_masked(masked, source).with_geometry(shifted, bounds)
}

// =============================================================================
// Strava Heatmap
// =============================================================================

/// Histogram-equalized heatmap over the buffered tile.
///
/// The first band is stretched to bytes over its own min/max, equalized
/// across the whole buffered area, then cropped. The output has one band and
/// nothing masked.
#[derive(Debug, Clone)]
pub struct StravaHeatmap {
    params: BufferParams,
}

impl StravaHeatmap {
    pub const NAME: &'static str = "stravaheatmap";

    pub fn new(params: BufferParams) -> Result<Self, AlgorithmError> {
        params.into_algorithm(Self::NAME, |params| Self { params })
    }

    pub fn params(&self) -> &BufferParams {
        &self.params
    }

    pub fn info() -> AlgorithmInfo {
        AlgorithmInfo::single_band(
            Self::NAME,
            "Histogram-equalized heatmap computed over a buffered tile",
            BufferParams::schema(),
        )
    }
}

#[async_trait]
impl Algorithm for StravaHeatmap {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn apply(&self, tile: &RasterTile) -> Result<ByteTile, AlgorithmError> {
        let band = first_band(tile)?;
        let window = self.params.central_window(tile)?;

        let range = ValueRange::of(band.iter().copied());
        trace!(min = range.min, max = range.max, "Equalizing buffered heatmap");

        let equalized = equalize_histogram(rescale_band(band, range).view());
        let cropped = equalized
            .slice(s![
                window.row_off..window.row_end(),
                window.col_off..window.col_end()
            ])
            .to_owned();

        let masked = MaskedBytes::unmasked(cropped.insert_axis(Axis(0)));
        Ok(crop_output(tile, &window, self.params.buffer, masked))
    }
}

// =============================================================================
// Strava CLAHE
// =============================================================================

/// CLAHE-enhanced heatmap over the buffered tile.
///
/// The first band is min/max-normalized to bytes, equalized with a 3x3 grid
/// and a clip limit of 1.0, then cropped. No-data is re-derived from the
/// original first band within the window, and the equalized band is repeated
/// for every input band.
#[derive(Debug, Clone)]
pub struct StravaClahe {
    params: BufferParams,
    clahe: Clahe,
}

impl StravaClahe {
    pub const NAME: &'static str = "stravaclahe";

    pub fn new(params: BufferParams) -> Result<Self, AlgorithmError> {
        params.into_algorithm(Self::NAME, |params| Self {
            params,
            clahe: Clahe::new(CLAHE_CLIP_LIMIT, CLAHE_GRID, CLAHE_GRID),
        })
    }

    pub fn params(&self) -> &BufferParams {
        &self.params
    }

    pub fn info() -> AlgorithmInfo {
        AlgorithmInfo::single_band(
            Self::NAME,
            "Contrast-limited adaptive equalization computed over a buffered tile",
            BufferParams::schema(),
        )
    }
}

#[async_trait]
impl Algorithm for StravaClahe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn apply(&self, tile: &RasterTile) -> Result<ByteTile, AlgorithmError> {
        let band = first_band(tile)?;
        let window = self.params.central_window(tile)?;

        let normalized = normalize_min_max(band, 0.0, NORMALIZE_BETA);
        let equalized = self.clahe.apply(normalized.view());
        let cropped = equalized.slice(s![
            window.row_off..window.row_end(),
            window.col_off..window.col_end()
        ]);

        let mask = NoDataMask::from_band(band).crop(&window);
        let masked = mask.apply_broadcast(cropped, tile.count());

        Ok(crop_output(tile, &window, self.params.buffer, masked))
    }
}
