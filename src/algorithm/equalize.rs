//! Contrast enhancement primitives on single-band byte images.
//!
//! - [`equalize_histogram`]: global histogram equalization
//! - [`normalize_min_max`]: linear min/max stretch of `f64` samples to bytes
//! - [`Clahe`]: contrast-limited adaptive histogram equalization
//!
//! All three follow OpenCV on byte input: halves round to even when
//! saturating to a byte, CLAHE pads both axes whenever either is not a
//! multiple of the grid, and clipped counts are redistributed the same way.
//! Interpolation runs in `f64` rather than `f32`, so a pixel can still land
//! one level apart when its weighted value sits on a rounding boundary.

use ndarray::{Array2, ArrayView2};

use crate::raster::ValueRange;

/// Number of histogram bins for byte images.
pub const HISTOGRAM_BINS: usize = 256;

fn histogram<I: IntoIterator<Item = u8>>(values: I) -> [usize; HISTOGRAM_BINS] {
    let mut hist = [0usize; HISTOGRAM_BINS];
    for v in values {
        hist[v as usize] += 1;
    }
    hist
}

/// Round to the nearest integer, halves to even.
#[inline]
fn round_half_even(value: f64) -> f64 {
    let rounded = value.round();
    if (rounded - value).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - value.signum()
    } else {
        rounded
    }
}

#[inline]
fn round_to_byte(value: f64) -> u8 {
    round_half_even(value).clamp(0.0, 255.0) as u8
}

// =============================================================================
// Global equalization
// =============================================================================

/// Equalize the histogram of a byte image.
///
/// The darkest occupied level maps to 0 and the cumulative distribution of
/// the remaining levels is spread over `[0, 255]`. An image with a single
/// occupied level is returned unchanged.
pub fn equalize_histogram(image: ArrayView2<'_, u8>) -> Array2<u8> {
    let total = image.len();
    let hist = histogram(image.iter().copied());

    let Some(first) = hist.iter().position(|&count| count > 0) else {
        return image.to_owned();
    };
    if hist[first] == total {
        return image.to_owned();
    }

    let scale = 255.0 / (total - hist[first]) as f64;
    let mut lut = [0u8; HISTOGRAM_BINS];
    let mut cumulative = 0usize;
    for level in first + 1..HISTOGRAM_BINS {
        cumulative += hist[level];
        lut[level] = round_to_byte(cumulative as f64 * scale);
    }

    image.mapv(|v| lut[v as usize])
}

// =============================================================================
// Min/max normalization
// =============================================================================

/// Stretch the valid samples of `band` linearly so that the minimum maps to
/// `alpha` and the maximum to `beta`, rounding and saturating to a byte.
///
/// `NaN` samples become 0. A band whose values are all equal (or all `NaN`)
/// maps to `alpha`.
pub fn normalize_min_max(band: ArrayView2<'_, f64>, alpha: f64, beta: f64) -> Array2<u8> {
    let range = ValueRange::of(band.iter().copied());

    let scale = if range.min.is_finite() && range.span() > f64::EPSILON {
        (beta - alpha) / range.span()
    } else {
        0.0
    };
    let shift = if range.min.is_finite() {
        alpha - range.min * scale
    } else {
        alpha
    };

    band.mapv(|v| {
        if v.is_nan() {
            0
        } else {
            // Float-to-int casts saturate, so a `beta` of 256 tops out at 255.
            round_half_even(v * scale + shift) as u8
        }
    })
}

// =============================================================================
// CLAHE
// =============================================================================

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles_x` by `tiles_y` grid (padded by
/// reflection to a multiple of the grid); each tile gets its own clipped
/// equalization LUT, and every pixel is bilinearly interpolated between the
/// LUTs of its four nearest tile centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: f64,
    tiles_x: usize,
    tiles_y: usize,
}

impl Clahe {
    pub fn new(clip_limit: f64, tiles_x: usize, tiles_y: usize) -> Self {
        Self {
            clip_limit,
            tiles_x: tiles_x.max(1),
            tiles_y: tiles_y.max(1),
        }
    }

    pub fn clip_limit(&self) -> f64 {
        self.clip_limit
    }

    pub fn grid(&self) -> (usize, usize) {
        (self.tiles_x, self.tiles_y)
    }

    pub fn apply(&self, image: ArrayView2<'_, u8>) -> Array2<u8> {
        let (height, width) = image.dim();
        if height == 0 || width == 0 {
            return image.to_owned();
        }

        let (tile_h, tile_w) = self.tile_size(height, width);
        let luts = self.tile_luts(image, tile_w, tile_h);

        let inv_tw = 1.0 / tile_w as f64;
        let inv_th = 1.0 / tile_h as f64;
        let last_x = self.tiles_x as isize - 1;
        let last_y = self.tiles_y as isize - 1;

        let column_weights: Vec<(usize, usize, f64)> = (0..width)
            .map(|x| {
                let txf = x as f64 * inv_tw - 0.5;
                let tx1 = txf.floor() as isize;
                let xa = txf - tx1 as f64;
                ((tx1.max(0)) as usize, ((tx1 + 1).min(last_x)) as usize, xa)
            })
            .collect();

        Array2::from_shape_fn((height, width), |(y, x)| {
            let tyf = y as f64 * inv_th - 0.5;
            let ty1 = tyf.floor() as isize;
            let ya = tyf - ty1 as f64;
            let ty2 = ((ty1 + 1).min(last_y)) as usize;
            let ty1 = (ty1.max(0)) as usize;

            let (tx1, tx2, xa) = column_weights[x];
            let v = image[[y, x]] as usize;

            let lut = |ty: usize, tx: usize| luts[ty * self.tiles_x + tx][v] as f64;
            let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
            let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
            round_to_byte(top * (1.0 - ya) + bottom * ya)
        })
    }

    /// Tile edge lengths for a `height` by `width` image.
    ///
    /// An image that is not a multiple of the grid on either axis is padded
    /// on both, by `tiles - len % tiles` pixels per axis.
    fn tile_size(&self, height: usize, width: usize) -> (usize, usize) {
        if height % self.tiles_y == 0 && width % self.tiles_x == 0 {
            return (height / self.tiles_y, width / self.tiles_x);
        }
        let padded_h = height + self.tiles_y - height % self.tiles_y;
        let padded_w = width + self.tiles_x - width % self.tiles_x;
        (padded_h / self.tiles_y, padded_w / self.tiles_x)
    }

    fn tile_luts(
        &self,
        image: ArrayView2<'_, u8>,
        tile_w: usize,
        tile_h: usize,
    ) -> Vec<[u8; HISTOGRAM_BINS]> {
        let (height, width) = image.dim();
        let tile_area = tile_w * tile_h;
        let clip = if self.clip_limit > 0.0 {
            ((self.clip_limit * tile_area as f64 / HISTOGRAM_BINS as f64) as usize).max(1)
        } else {
            0
        };
        let lut_scale = 255.0 / tile_area as f64;

        let mut luts = Vec::with_capacity(self.tiles_x * self.tiles_y);
        for ty in 0..self.tiles_y {
            for tx in 0..self.tiles_x {
                let rows = ty * tile_h..(ty + 1) * tile_h;
                let mut hist = histogram(rows.flat_map(|y| {
                    (tx * tile_w..(tx + 1) * tile_w)
                        .map(move |x| image[[reflect_101(y, height), reflect_101(x, width)]])
                }));

                if clip > 0 {
                    clip_histogram(&mut hist, clip);
                }

                let mut lut = [0u8; HISTOGRAM_BINS];
                let mut cumulative = 0usize;
                for (level, count) in hist.iter().enumerate() {
                    cumulative += count;
                    lut[level] = round_to_byte(cumulative as f64 * lut_scale);
                }
                luts.push(lut);
            }
        }
        luts
    }
}

/// Cap every bin at `clip` and spread the excess evenly over all bins, the
/// remainder one count at a time at a regular stride.
fn clip_histogram(hist: &mut [usize; HISTOGRAM_BINS], clip: usize) {
    let mut clipped = 0usize;
    for count in hist.iter_mut() {
        if *count > clip {
            clipped += *count - clip;
            *count = clip;
        }
    }

    let batch = clipped / HISTOGRAM_BINS;
    let mut residual = clipped - batch * HISTOGRAM_BINS;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (HISTOGRAM_BINS / residual).max(1);
        let mut level = 0;
        while level < HISTOGRAM_BINS && residual > 0 {
            hist[level] += 1;
            residual -= 1;
            level += step;
        }
    }
}

/// Index into `0..len` mirrored around the edges without repeating them
/// (`dcb|abcd|cba`).
fn reflect_101(index: usize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = index % period;
    if i >= len {
        period - i
    } else {
        i
    }
}
