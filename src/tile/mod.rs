//! Tile processing layer.
//!
//! This module turns a decoded raster tile into an encoded, optionally
//! colorized PNG by running one registered algorithm over it.
//!
//! # Architecture
//!
//! The processor sits between the request-handling layer and the algorithms:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Request handling layer         │
//! └────────────────────┬────────────────────┘
//!                      │ RasterTile + ProcessRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileProcessor              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  Algorithm   │  │  PNG Encoder    │  │
//! │  │  (rescale /  │  │  (gray, RGBA,   │  │
//! │  │   equalize)  │  │   colormap)     │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │       StatsCache → RasterSource         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileProcessor`]: resolves the colormap, builds and applies the algorithm, encodes
//! - [`PngTileEncoder`]: writes a byte tile as PNG, colorizing when asked
//! - [`ProcessRequest`]: algorithm and colormap options for one tile
//! - [`ProcessedTile`]: byte tile, encoded PNG and whether it was colorized

mod encoder;
mod service;

pub use encoder::PngTileEncoder;
pub use service::{to_byte_tile, ProcessRequest, ProcessedTile, TileProcessor};
