//! Linear rescaling onto the byte range, and the `masked-rescale` algorithm.

use async_trait::async_trait;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::Deserialize;
use serde_json::json;

use crate::error::AlgorithmError;
use crate::raster::{ByteTile, RasterTile, ValueRange};

use super::mask::NoDataMask;
use super::{first_band, Algorithm, AlgorithmInfo};

// =============================================================================
// Rescale primitives
// =============================================================================

/// Map `value` linearly from `input` onto `output`.
///
/// Values outside `input` are clamped to it first. An improper input range
/// (non-finite, or `max <= min`) maps everything to `output.min`. `NaN`
/// stays `NaN`.
#[inline]
pub fn linear_rescale(value: f64, input: ValueRange, output: ValueRange) -> f64 {
    if !input.is_proper() {
        return output.min;
    }
    let clamped = value.clamp(input.min, input.max);
    (clamped - input.min) / input.span() * output.span() + output.min
}

/// Truncating, saturating conversion to a byte; `NaN` becomes 0.
#[inline]
pub fn to_byte(value: f64) -> u8 {
    value as u8
}

/// Rescale one band from `input` onto `[0, 255]`.
pub fn rescale_band(band: ArrayView2<'_, f64>, input: ValueRange) -> Array2<u8> {
    band.mapv(|v| to_byte(linear_rescale(v, input, ValueRange::BYTE)))
}

/// Rescale every band onto `[0, 255]`.
///
/// `ranges[i]` applies to band `i`; a single range applies to all bands.
pub fn rescale_bands(data: &Array3<f64>, ranges: &[ValueRange]) -> Array3<u8> {
    let mut out = Array3::zeros(data.dim());
    for (index, (band, mut target)) in data
        .axis_iter(Axis(0))
        .zip(out.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let range = ranges
            .get(index)
            .or_else(|| ranges.first())
            .copied()
            .unwrap_or(ValueRange::new(f64::NAN, f64::NAN));
        target.assign(&rescale_band(band, range));
    }
    out
}

// =============================================================================
// Masked Rescale
// =============================================================================

/// Parameters for [`MaskedRescale`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MaskedRescaleParams {
    /// Input value mapped to 0
    pub min: f64,

    /// Input value mapped to 255
    pub max: f64,
}

impl Default for MaskedRescaleParams {
    fn default() -> Self {
        Self {
            min: -1.0,
            max: 1.0,
        }
    }
}

impl MaskedRescaleParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err("min and max must be finite".to_string());
        }
        if self.min >= self.max {
            return Err(format!(
                "min ({}) must be less than max ({})",
                self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Rescale a fixed `[min, max]` onto `[0, 255]`, forcing no-data to 0 with a
/// 255 mask.
#[derive(Debug, Clone)]
pub struct MaskedRescale {
    range: ValueRange,
}

impl MaskedRescale {
    pub const NAME: &'static str = "masked-rescale";

    pub fn new(params: MaskedRescaleParams) -> Result<Self, AlgorithmError> {
        params
            .validate()
            .map_err(|message| AlgorithmError::InvalidParameters {
                algorithm: Self::NAME.to_string(),
                message,
            })?;
        Ok(Self {
            range: ValueRange::new(params.min, params.max),
        })
    }

    pub fn info() -> AlgorithmInfo {
        let defaults = MaskedRescaleParams::default();
        AlgorithmInfo::single_band(
            Self::NAME,
            "Rescale a fixed value range to bytes, masking no-data",
            json!({
                "min": { "type": "number", "default": defaults.min },
                "max": { "type": "number", "default": defaults.max },
            }),
        )
    }
}

#[async_trait]
impl Algorithm for MaskedRescale {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn apply(&self, tile: &RasterTile) -> Result<ByteTile, AlgorithmError> {
        let mask = NoDataMask::from_band(first_band(tile)?);
        let bytes = rescale_bands(tile.data(), &[self.range]);
        Ok(ByteTile::from_masked(mask.apply(bytes.view()), tile))
    }
}
