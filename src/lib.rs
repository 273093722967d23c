//! # Tiler Post-processing
//!
//! Pixel post-processing for a web map tile server.
//!
//! Given a decoded raster tile (possibly multi-band, possibly with no-data
//! marked as `NaN`), this library applies one of several named algorithms to
//! produce a byte-quantized, renderable tile, optionally colorizes it with a
//! palette, and encodes it as PNG.
//!
//! ## Features
//!
//! - **Masked rescale**: fixed-range linear rescale with a no-data mask
//! - **Buffered equalization**: histogram equalization and CLAHE computed
//!   over a buffered tile so neighbors stay consistent, then cropped
//! - **Bbox statistics**: rescale by the min/max of a bounding box at coarse
//!   scales, shared through a TTL cache with in-flight de-duplication
//! - **Colormaps**: built-in palettes and custom JSON colormaps
//!
//! ## Architecture
//!
//! - [`raster`] - Tile model, georeferencing, and the raster source seam
//! - [`algorithm`] - Masking, rescale, equalization and the algorithm registry
//! - [`stats`] - Bounding-box statistics cache
//! - [`colormap`] - Palette generation and resolution
//! - [`tile`] - Tile processor and PNG encoder
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ndarray::Array3;
//! use tiler_postprocess::{
//!     Affine, AlgorithmContext, AlgorithmRegistry, ColormapRegistry, MemoryRasterSource,
//!     ProcessRequest, RasterTile, StatsCache, TileProcessor,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(StatsCache::new(Arc::new(MemoryRasterSource::new())));
//!     let processor = TileProcessor::new(
//!         AlgorithmRegistry::new(AlgorithmContext::new(cache)),
//!         ColormapRegistry::new(),
//!     );
//!
//!     let tile = RasterTile::new(
//!         Array3::zeros((1, 256, 256)),
//!         Affine::from_origin(0.0, 256.0, 1.0, 1.0),
//!         "EPSG:3857",
//!     );
//!     let request = ProcessRequest::new()
//!         .with_algorithm("masked-rescale", Some(r#"{"min": 0, "max": 100}"#))
//!         .with_colormap_name("colorblind");
//!
//!     let processed = processor.process(&tile, &request).await.unwrap();
//!     println!("{} byte PNG", processed.data.len());
//! }
//! ```

pub mod algorithm;
pub mod colormap;
pub mod config;
pub mod error;
pub mod raster;
pub mod stats;
pub mod tile;

// Re-export commonly used types
pub use algorithm::{
    Algorithm, AlgorithmContext, AlgorithmInfo, AlgorithmRegistry, BBoxStats, MaskedBytes,
    MaskedRescale, NoDataMask, OutputDtype, StravaClahe, StravaHeatmap,
};
pub use colormap::{Colormap, ColormapRegistry, ColormapType};
pub use config::{Cli, Command, Config};
pub use error::{AlgorithmError, ColormapError, ErrorResponse, IoError, ProcessError};
pub use raster::{
    Affine, BoundingBox, ByteTile, MemoryRasterSource, RasterReader, RasterSource, RasterTile,
    ValueRange, Window,
};
pub use stats::{StatsCache, StatsCacheKey};
pub use tile::{PngTileEncoder, ProcessRequest, ProcessedTile, TileProcessor};
