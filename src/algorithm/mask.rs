//! No-data masking.
//!
//! No-data is marked by `NaN` in the source samples. A [`NoDataMask`] is the
//! boolean `(row, col)` map of those positions; [`NoDataMask::apply`] pairs
//! byte values with a 0/255 validity channel ([`MaskedBytes`]), zeroing the
//! values under the mask. Masks are derived from the first band and
//! broadcast to every band.

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use crate::raster::Window;

/// Mask channel value for a valid pixel.
pub const MASK_VALID: u8 = 0;

/// Mask channel value for a no-data pixel.
pub const MASK_NODATA: u8 = 255;

/// Boolean no-data mask: `true` where the source sample is `NaN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoDataMask {
    mask: Array2<bool>,
}

impl NoDataMask {
    /// Derive the mask from one band of source samples.
    pub fn from_band(band: ArrayView2<'_, f64>) -> Self {
        Self {
            mask: band.mapv(f64::is_nan),
        }
    }

    /// A mask with nothing masked.
    pub fn empty(height: usize, width: usize) -> Self {
        Self {
            mask: Array2::from_elem((height, width), false),
        }
    }

    /// `(rows, cols)` shape.
    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask[[row, col]]
    }

    /// Number of masked positions.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.mask
    }

    /// The same mask restricted to a pixel window.
    ///
    /// # Panics
    /// Panics if the window exceeds the mask shape.
    pub fn crop(&self, window: &Window) -> Self {
        Self {
            mask: self
                .mask
                .slice(s![
                    window.row_off..window.row_end(),
                    window.col_off..window.col_end()
                ])
                .to_owned(),
        }
    }

    /// Zero the masked positions of every band of `values` and build the
    /// matching 0/255 mask channel.
    ///
    /// # Panics
    /// Panics if the `(row, col)` shape of `values` differs from the mask.
    pub fn apply(&self, values: ArrayView3<'_, u8>) -> MaskedBytes {
        let (bands, rows, cols) = values.dim();
        assert_eq!(
            (rows, cols),
            self.dim(),
            "mask shape must match the band shape"
        );

        let mut data = values.to_owned();
        let mut mask = Array3::from_elem((bands, rows, cols), MASK_VALID);

        for (mut data_band, mut mask_band) in data
            .axis_iter_mut(Axis(0))
            .zip(mask.axis_iter_mut(Axis(0)))
        {
            Zip::from(&mut data_band)
                .and(&mut mask_band)
                .and(&self.mask)
                .for_each(|value, flag, &masked| {
                    if masked {
                        *value = 0;
                        *flag = MASK_NODATA;
                    }
                });
        }

        MaskedBytes { data, mask }
    }

    /// [`apply`](Self::apply) for a single band, broadcast to `bands` copies.
    pub fn apply_broadcast(&self, band: ArrayView2<'_, u8>, bands: usize) -> MaskedBytes {
        let (rows, cols) = band.dim();
        let stacked = band
            .broadcast((bands.max(1), rows, cols))
            .map(|view| view.to_owned())
            .unwrap_or_else(|| band.insert_axis(Axis(0)).to_owned());
        self.apply(stacked.view())
    }
}

/// Byte values paired with their 0/255 validity channel (same shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedBytes {
    data: Array3<u8>,
    mask: Array3<u8>,
}

impl MaskedBytes {
    /// Values with every pixel valid.
    pub fn unmasked(data: Array3<u8>) -> Self {
        let mask = Array3::from_elem(data.dim(), MASK_VALID);
        Self { data, mask }
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    pub fn mask(&self) -> &Array3<u8> {
        &self.mask
    }

    pub fn into_parts(self) -> (Array3<u8>, Array3<u8>) {
        (self.data, self.mask)
    }
}
