//! Colormap resolution and colorization.
//!
//! A [`Colormap`] maps a byte sample to an RGBA color. Named palettes live in
//! a [`ColormapRegistry`] built once at startup; custom colormaps arrive as a
//! JSON object per request and are parsed by
//! [`ColormapRegistry::resolve`].
//!
//! Built-in palettes:
//!
//! - `colorblind`: 256-entry ramp through 10 anchor colors, value 0 transparent
//! - `nbinary`: value 0 transparent, value 1 opaque yellow

mod palette;
mod registry;

pub use palette::{
    binary, colorblind, linear_ramp, linear_segmented, parse_color, parse_custom, Colormap, Rgba,
    RAMP_SIZE, TRANSPARENT,
};
pub use registry::{ColormapRegistry, ColormapType, BINARY, COLORBLIND};
