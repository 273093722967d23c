//! Raster tile model and resource access.
//!
//! # Components
//!
//! - [`RasterTile`]: decoded `(band, row, col)` `f64` tile with georeferencing
//! - [`ByteTile`]: renderable `u8` output with a 0/255 no-data mask
//! - [`ValueRange`]: per-band `(min, max)` statistic pair
//! - [`Affine`], [`BoundingBox`], [`Window`]: georeferencing primitives
//! - [`RasterSource`] / [`RasterReader`]: open a resource and read a bbox subset
//! - [`MemoryRasterSource`]: in-memory [`RasterSource`]

mod geo;
mod source;
mod tile;

pub use geo::{Affine, BoundingBox, Window};
pub use source::{MemoryRasterReader, MemoryRasterSource, RasterReader, RasterSource};
pub use tile::{ByteTile, RasterTile, ValueRange};
