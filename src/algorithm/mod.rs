//! Tile post-processing algorithms.
//!
//! An [`Algorithm`] turns a decoded [`RasterTile`] into a renderable
//! [`ByteTile`]. Algorithms are constructed by name from JSON parameters
//! through the [`AlgorithmRegistry`].
//!
//! | Name             | Type               | Statistics                  |
//! |------------------|--------------------|-----------------------------|
//! | `masked-rescale` | [`MaskedRescale`]  | fixed `min`/`max`           |
//! | `stravaheatmap`  | [`StravaHeatmap`]  | buffered histogram          |
//! | `stravaclahe`    | [`StravaClahe`]    | buffered tiled histograms   |
//! | `bboxstats`      | [`BBoxStats`]      | dataset or bbox min/max     |

mod bbox;
mod buffered;
mod equalize;
mod mask;
mod registry;
mod rescale;

use std::fmt;

use async_trait::async_trait;
use ndarray::ArrayView2;
use serde::Serialize;

use crate::error::AlgorithmError;
use crate::raster::{ByteTile, RasterTile};

pub use bbox::{BBoxStats, BBoxStatsParams, DEFAULT_BBOX_SCALE};
pub use buffered::{
    BufferParams, StravaClahe, StravaHeatmap, CLAHE_CLIP_LIMIT, CLAHE_GRID, DEFAULT_BUFFER,
    DEFAULT_TILESIZE,
};
pub use equalize::{equalize_histogram, normalize_min_max, Clahe, HISTOGRAM_BINS};
pub use mask::{MaskedBytes, NoDataMask, MASK_NODATA, MASK_VALID};
pub use registry::{AlgorithmBuilder, AlgorithmContext, AlgorithmRegistry};
pub use rescale::{
    linear_rescale, rescale_band, rescale_bands, to_byte, MaskedRescale, MaskedRescaleParams,
};

/// Sample type of an algorithm's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDtype {
    Uint8,
}

impl OutputDtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputDtype::Uint8 => "uint8",
        }
    }
}

impl fmt::Display for OutputDtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named transformation from decoded samples to a masked byte tile.
///
/// Implementations must not mutate the input and must return data and mask
/// of identical shape.
#[async_trait]
pub trait Algorithm: Send + Sync + fmt::Debug {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Bands read from the input.
    fn input_nbands(&self) -> usize {
        1
    }

    /// Bands produced.
    fn output_nbands(&self) -> usize {
        1
    }

    fn output_dtype(&self) -> OutputDtype {
        OutputDtype::Uint8
    }

    /// Process one tile.
    async fn apply(&self, tile: &RasterTile) -> Result<ByteTile, AlgorithmError>;
}

/// Public description of a registered algorithm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmInfo {
    pub name: String,
    pub title: String,
    pub input_nbands: usize,
    pub output_nbands: usize,
    pub output_dtype: OutputDtype,

    /// Accepted parameters, with types and defaults
    pub parameters: serde_json::Value,
}

impl AlgorithmInfo {
    /// Describe a one-band-in, one-band-out byte algorithm.
    pub fn single_band(
        name: impl Into<String>,
        title: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            input_nbands: 1,
            output_nbands: 1,
            output_dtype: OutputDtype::Uint8,
            parameters,
        }
    }
}

/// The band no-data is derived from.
pub(crate) fn first_band(tile: &RasterTile) -> Result<ArrayView2<'_, f64>, AlgorithmError> {
    if tile.count() == 0 {
        return Err(AlgorithmError::EmptyTile);
    }
    Ok(tile.band(0))
}
