//! Rescale by the statistics of a bounding box.
//!
//! At coarse zoom levels (scale above the configured threshold) the tile's
//! own dataset statistics are too broad, so the min/max are taken from the
//! requested bounding box of the primary source asset instead, through the
//! shared [`StatsCache`]. At or below the threshold the dataset statistics
//! supplied with the tile are used.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::AlgorithmError;
use crate::raster::{BoundingBox, ByteTile, RasterTile, ValueRange};
use crate::stats::StatsCache;

use super::mask::NoDataMask;
use super::rescale::rescale_bands;
use super::{first_band, Algorithm, AlgorithmInfo};

/// Scale above which bbox statistics replace dataset statistics.
pub const DEFAULT_BBOX_SCALE: u32 = 6;

fn default_scale() -> u32 {
    1
}

/// Parameters for [`BBoxStats`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BBoxStatsParams {
    /// `[left, bottom, right, top]` of the statistics area
    pub bbox: [f64; 4],

    /// Request scale, compared against the threshold
    #[serde(default = "default_scale")]
    pub scale: u32,
}

impl BBoxStatsParams {
    pub fn validate(&self) -> Result<(), String> {
        let bbox = BoundingBox::from_array(self.bbox);
        if !bbox.is_valid() {
            return Err(format!("bbox {bbox} must be finite with left < right and bottom < top"));
        }
        Ok(())
    }
}

/// Rescale every band by dataset or bounding-box statistics, masking no-data.
#[derive(Clone)]
pub struct BBoxStats {
    bbox: BoundingBox,
    scale: u32,
    threshold: u32,
    cache: Arc<StatsCache>,
}

impl std::fmt::Debug for BBoxStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxStats")
            .field("bbox", &self.bbox)
            .field("scale", &self.scale)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl BBoxStats {
    pub const NAME: &'static str = "bboxstats";

    pub fn new(
        params: BBoxStatsParams,
        threshold: u32,
        cache: Arc<StatsCache>,
    ) -> Result<Self, AlgorithmError> {
        params
            .validate()
            .map_err(|message| AlgorithmError::InvalidParameters {
                algorithm: Self::NAME.to_string(),
                message,
            })?;
        Ok(Self {
            bbox: BoundingBox::from_array(params.bbox),
            scale: params.scale,
            threshold,
            cache,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Whether this request reads statistics from the bounding box.
    pub fn uses_bbox_statistics(&self) -> bool {
        self.scale > self.threshold
    }

    pub fn info() -> AlgorithmInfo {
        AlgorithmInfo::single_band(
            Self::NAME,
            "Rescale using bounding-box statistics at coarse scales",
            json!({
                "bbox": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 4,
                    "maxItems": 4,
                    "required": true,
                },
                "scale": { "type": "integer", "minimum": 0, "default": default_scale() },
            }),
        )
    }

    async fn statistics(&self, tile: &RasterTile) -> Result<Vec<ValueRange>, AlgorithmError> {
        if self.uses_bbox_statistics() {
            let resource = tile.assets().first().ok_or(AlgorithmError::MissingAsset)?;
            debug!(
                resource = resource.as_str(),
                bbox = %self.bbox,
                scale = self.scale,
                "Rescaling with bbox statistics"
            );
            let statistics = self.cache.get_or_compute(resource, &self.bbox).await?;
            Ok(statistics.to_vec())
        } else {
            tile.dataset_statistics()
                .map(<[ValueRange]>::to_vec)
                .ok_or(AlgorithmError::MissingDatasetStatistics)
        }
    }
}

#[async_trait]
impl Algorithm for BBoxStats {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn apply(&self, tile: &RasterTile) -> Result<ByteTile, AlgorithmError> {
        let mask = NoDataMask::from_band(first_band(tile)?);
        let ranges = self.statistics(tile).await?;
        let bytes = rescale_bands(tile.data(), &ranges);
        Ok(ByteTile::from_masked(mask.apply(bytes.view()), tile))
    }
}
