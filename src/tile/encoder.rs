//! PNG tile encoder.
//!
//! Turns a processed [`ByteTile`] into an encoded PNG image.
//!
//! # Pixel layout
//!
//! - **With a colormap**: the first band is colorized to RGBA; masked pixels
//!   and values missing from the palette are transparent.
//! - **Without a colormap**: three bands are written as RGBA, any other band
//!   count as gray + alpha from the first band.
//!
//! In every uncolorized layout the alpha channel is `255 - mask`.

use bytes::Bytes;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, GrayAlphaImage, LumaA, Rgba, RgbaImage};

use crate::colormap::Colormap;
use crate::error::ProcessError;
use crate::raster::ByteTile;

// =============================================================================
// PNG Encoder
// =============================================================================

/// PNG encoder for processed byte tiles.
///
/// # Example
///
/// ```ignore
/// use tiler_postprocess::tile::PngTileEncoder;
///
/// let encoder = PngTileEncoder::new();
/// let png = encoder.encode(&byte_tile, None)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PngTileEncoder {}

impl PngTileEncoder {
    /// Create a new PNG tile encoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Build the output image for `tile`, colorized when `colormap` is given.
    pub fn render(&self, tile: &ByteTile, colormap: Option<&Colormap>) -> DynamicImage {
        if let Some(colormap) = colormap {
            return DynamicImage::ImageRgba8(colormap.apply(tile));
        }

        let width = tile.width() as u32;
        let height = tile.height() as u32;
        let data = tile.data();
        let mask = tile.mask();

        match tile.count() {
            0 => DynamicImage::ImageLumaA8(GrayAlphaImage::new(width, height)),
            3 => DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
                let (row, col) = (y as usize, x as usize);
                Rgba([
                    data[[0, row, col]],
                    data[[1, row, col]],
                    data[[2, row, col]],
                    255 - mask[[0, row, col]],
                ])
            })),
            _ => DynamicImage::ImageLumaA8(GrayAlphaImage::from_fn(width, height, |x, y| {
                let (row, col) = (y as usize, x as usize);
                LumaA([data[[0, row, col]], 255 - mask[[0, row, col]]])
            })),
        }
    }

    /// Render and encode `tile` as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Encode`] if PNG encoding fails.
    pub fn encode(&self, tile: &ByteTile, colormap: Option<&Colormap>) -> Result<Bytes, ProcessError> {
        self.encode_image(&self.render(tile, colormap))
    }

    /// Encode an already-rendered image as PNG.
    pub fn encode_image(&self, image: &DynamicImage) -> Result<Bytes, ProcessError> {
        let mut output = Vec::new();
        image
            .write_with_encoder(PngEncoder::new(&mut output))
            .map_err(|e| ProcessError::Encode {
                message: e.to_string(),
            })?;
        Ok(Bytes::from(output))
    }
}
