//! Georeferencing primitives: affine transforms, bounding boxes and pixel windows.
//!
//! The affine transform follows the GDAL/rasterio coefficient order:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! For a north-up raster `b == d == 0`, `a` is the pixel width and `e` the
//! (negative) pixel height.

use std::fmt;

// =============================================================================
// Bounding Box
// =============================================================================

/// A rectangular extent in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Build from `[left, bottom, right, top]`.
    pub const fn from_array(coords: [f64; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub const fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// All four coordinates are finite and the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
            && self.left < self.right
            && self.bottom < self.top
    }

    /// Whether the two boxes share any area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.bottom < other.top
            && other.bottom < self.top
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.left, self.bottom, self.right, self.top
        )
    }
}

// =============================================================================
// Pixel Window
// =============================================================================

/// A rectangular block of pixels, offset from the top-left of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub const fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// The `size x size` window starting `offset` pixels in from each edge.
    pub const fn centered(offset: usize, size: usize) -> Self {
        Self::new(offset, offset, size, size)
    }

    pub const fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    pub const fn col_end(&self) -> usize {
        self.col_off + self.width
    }
}

// =============================================================================
// Affine Transform
// =============================================================================

/// Pixel → world affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// North-up transform anchored at the top-left corner `(west, north)`.
    pub const fn from_origin(west: f64, north: f64, xres: f64, yres: f64) -> Self {
        Self::new(xres, 0.0, west, 0.0, -yres, north)
    }

    /// Transform that maps the pixel grid of `width x height` onto `bounds`.
    pub fn from_bounds(bounds: &BoundingBox, width: usize, height: usize) -> Self {
        Self::from_origin(
            bounds.left,
            bounds.top,
            bounds.width() / width as f64,
            bounds.height() / height as f64,
        )
    }

    /// World coordinates of the pixel corner `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// The world → pixel transform, or `None` if this transform is singular.
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(Affine::new(
            ia,
            ib,
            -ia * self.c - ib * self.f,
            id,
            ie,
            -id * self.c - ie * self.f,
        ))
    }

    /// The transform of a raster whose origin is moved to pixel `(col, row)`.
    pub fn translated(&self, col: f64, row: f64) -> Affine {
        let (c, f) = self.apply(col, row);
        Affine::new(self.a, self.b, c, self.d, self.e, f)
    }

    /// Geographic bounds covered by a pixel window.
    pub fn window_bounds(&self, window: &Window) -> BoundingBox {
        let c0 = window.col_off as f64;
        let r0 = window.row_off as f64;
        let c1 = window.col_end() as f64;
        let r1 = window.row_end() as f64;

        let corners = [
            self.apply(c0, r0),
            self.apply(c1, r0),
            self.apply(c0, r1),
            self.apply(c1, r1),
        ];

        let (mut left, mut bottom) = (f64::INFINITY, f64::INFINITY);
        let (mut right, mut top) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            left = left.min(x);
            right = right.max(x);
            bottom = bottom.min(y);
            top = top.max(y);
        }

        BoundingBox::new(left, bottom, right, top)
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}
