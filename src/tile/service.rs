//! Tile processor orchestrating post-processing of a decoded tile.
//!
//! # Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileProcessor                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    process()                            │    │
//! │  │  1. Resolve colormap   4. Colorize (optional)           │    │
//! │  │  2. Build algorithm    5. Encode PNG                    │    │
//! │  │  3. Apply to tile                                       │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │            │
//! │           ▼                    ▼                    ▼            │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌────────────────┐  │
//! │  │ColormapRegistry │  │AlgorithmRegistry │  │ PngTileEncoder │  │
//! │  └─────────────────┘  └──────────────────┘  └────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The colormap is resolved first so a malformed colormap fails the request
//! before any pixel work is done.

use std::sync::Arc;

use bytes::Bytes;
use ndarray::Axis;
use tracing::debug;

use crate::algorithm::{to_byte, AlgorithmRegistry, MaskedBytes, NoDataMask};
use crate::colormap::{ColormapRegistry, ColormapType};
use crate::error::ProcessError;
use crate::raster::{ByteTile, RasterTile};

use super::encoder::PngTileEncoder;

// =============================================================================
// Process Request
// =============================================================================

/// Post-processing options for one tile.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    /// Registered algorithm name; `None` converts the tile directly to bytes
    pub algorithm: Option<String>,

    /// JSON object of algorithm parameters
    pub algorithm_params: Option<String>,

    /// Registered palette name
    pub colormap_name: Option<String>,

    /// JSON-encoded custom colormap
    pub colormap: Option<String>,

    /// How a custom colormap is applied
    pub colormap_type: ColormapType,
}

impl ProcessRequest {
    /// A request with no algorithm and no colormap.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_algorithm(mut self, name: impl Into<String>, params: Option<&str>) -> Self {
        self.algorithm = Some(name.into());
        self.algorithm_params = params.map(str::to_string);
        self
    }

    pub fn with_colormap_name(mut self, name: impl Into<String>) -> Self {
        self.colormap_name = Some(name.into());
        self
    }

    pub fn with_colormap(mut self, colormap: impl Into<String>, colormap_type: ColormapType) -> Self {
        self.colormap = Some(colormap.into());
        self.colormap_type = colormap_type;
        self
    }
}

// =============================================================================
// Processed Tile
// =============================================================================

/// Result of processing one tile.
#[derive(Debug, Clone)]
pub struct ProcessedTile {
    /// Byte tile produced by the algorithm (before colorization)
    pub tile: ByteTile,

    /// Encoded PNG
    pub data: Bytes,

    /// Whether a colormap was applied
    pub colormap_applied: bool,
}

// =============================================================================
// Tile Processor
// =============================================================================

/// Runs the post-processing pipeline against shared registries.
///
/// # Example
///
/// ```ignore
/// use tiler_postprocess::tile::{ProcessRequest, TileProcessor};
///
/// let processor = TileProcessor::new(algorithms, colormaps);
/// let request = ProcessRequest::new()
///     .with_algorithm("stravaheatmap", Some(r#"{"buffer": 512}"#))
///     .with_colormap_name("colorblind");
/// let processed = processor.process(&tile, &request).await?;
/// ```
pub struct TileProcessor {
    algorithms: Arc<AlgorithmRegistry>,
    colormaps: Arc<ColormapRegistry>,
    encoder: PngTileEncoder,
}

impl TileProcessor {
    pub fn new(algorithms: AlgorithmRegistry, colormaps: ColormapRegistry) -> Self {
        Self::with_shared(Arc::new(algorithms), Arc::new(colormaps))
    }

    /// Create a processor over registries shared with other components.
    pub fn with_shared(algorithms: Arc<AlgorithmRegistry>, colormaps: Arc<ColormapRegistry>) -> Self {
        Self {
            algorithms,
            colormaps,
            encoder: PngTileEncoder::new(),
        }
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }

    pub fn colormaps(&self) -> &ColormapRegistry {
        &self.colormaps
    }

    /// Post-process `tile` as `request` asks and encode the result.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Colormap`] for an unknown or malformed colormap
    /// - [`ProcessError::Algorithm`] for an unknown algorithm, invalid
    ///   parameters, or a failure while applying it
    /// - [`ProcessError::Encode`] if PNG encoding fails
    pub async fn process(
        &self,
        tile: &RasterTile,
        request: &ProcessRequest,
    ) -> Result<ProcessedTile, ProcessError> {
        let colormap = self.colormaps.resolve(
            request.colormap_name.as_deref(),
            request.colormap.as_deref(),
            request.colormap_type,
        )?;

        let output = match request.algorithm.as_deref() {
            Some(name) => {
                let algorithm = self
                    .algorithms
                    .create(name, request.algorithm_params.as_deref())?;
                debug!(
                    algorithm = algorithm.name(),
                    bands = tile.count(),
                    height = tile.height(),
                    width = tile.width(),
                    "Applying algorithm"
                );
                algorithm.apply(tile).await?
            }
            None => to_byte_tile(tile),
        };

        let data = self.encoder.encode(&output, colormap.as_deref())?;

        Ok(ProcessedTile {
            tile: output,
            data,
            colormap_applied: colormap.is_some(),
        })
    }
}

/// Convert samples to bytes without an algorithm: saturating cast per value,
/// `NaN` masked.
pub fn to_byte_tile(tile: &RasterTile) -> ByteTile {
    let bytes = tile.data().mapv(to_byte);
    let masked = match tile.data().axis_iter(Axis(0)).next() {
        Some(band) => NoDataMask::from_band(band).apply(bytes.view()),
        None => MaskedBytes::unmasked(bytes),
    };
    ByteTile::from_masked(masked, tile)
}
