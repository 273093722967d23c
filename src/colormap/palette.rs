//! Palette construction and color parsing.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::ColormapError;
use crate::raster::ByteTile;

/// An `[r, g, b, a]` byte color.
pub type Rgba = [u8; 4];

/// Fully transparent black.
pub const TRANSPARENT: Rgba = [0, 0, 0, 0];

/// Anchor colors of the colorblind-safe ramp, light to dark.
const COLORBLIND_ANCHORS: [[u8; 3]; 10] = [
    [0xf0, 0xf9, 0x21],
    [0xfd, 0xca, 0x26],
    [0xfb, 0x9f, 0x3a],
    [0xed, 0x79, 0x53],
    [0xd8, 0x57, 0x6b],
    [0xbd, 0x37, 0x86],
    [0x9c, 0x17, 0x9e],
    [0x72, 0x01, 0xa8],
    [0x46, 0x03, 0x9f],
    [0x0d, 0x08, 0x87],
];

/// Opaque color of value 1 in the binary palette.
const BINARY_COLOR: Rgba = [240, 249, 33, 255];

/// Entries in a full byte ramp.
pub const RAMP_SIZE: usize = 256;

// =============================================================================
// Colormap
// =============================================================================

/// Lookup table from a byte value to a display color.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Colormap {
    entries: BTreeMap<u8, Rgba>,
}

impl Colormap {
    pub fn new(entries: BTreeMap<u8, Rgba>) -> Self {
        Self { entries }
    }

    /// A ramp whose entry `i` is `colors[i]`.
    pub fn from_ramp(colors: &[Rgba]) -> Self {
        Self {
            entries: colors
                .iter()
                .take(RAMP_SIZE)
                .enumerate()
                .map(|(i, &color)| (i as u8, color))
                .collect(),
        }
    }

    pub fn get(&self, value: u8) -> Option<Rgba> {
        self.entries.get(&value).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, Rgba)> + '_ {
        self.entries.iter().map(|(&value, &color)| (value, color))
    }

    /// Colorize the first band of `tile`.
    ///
    /// Values without an entry become transparent, as do masked pixels.
    pub fn apply(&self, tile: &ByteTile) -> image::RgbaImage {
        let width = tile.width() as u32;
        let height = tile.height() as u32;
        if tile.count() == 0 {
            return image::RgbaImage::new(width, height);
        }

        let band = tile.band(0);
        image::RgbaImage::from_fn(width, height, |x, y| {
            let (row, col) = (y as usize, x as usize);
            let mut color = self.get(band[[row, col]]).unwrap_or(TRANSPARENT);
            if !tile.is_valid(row, col) {
                color[3] = 0;
            }
            image::Rgba(color)
        })
    }
}

// =============================================================================
// Built-in palettes
// =============================================================================

/// The 256-entry colorblind-safe ramp; entry 0 is transparent.
pub fn colorblind() -> Colormap {
    let anchors: Vec<(f64, [f64; 4])> = COLORBLIND_ANCHORS
        .iter()
        .enumerate()
        .map(|(i, &[r, g, b])| {
            let position = i as f64 / (COLORBLIND_ANCHORS.len() - 1) as f64;
            (position, unit_color([r, g, b, 255]))
        })
        .collect();

    let mut ramp = linear_segmented(&anchors, RAMP_SIZE);
    ramp[0][3] = 0;
    Colormap::from_ramp(&ramp)
}

/// Two entries: 0 transparent, 1 opaque yellow.
pub fn binary() -> Colormap {
    Colormap::new(BTreeMap::from([(0, TRANSPARENT), (1, BINARY_COLOR)]))
}

/// Interpolate `anchors` (sorted `(position in [0, 1], unit RGBA)`) into `n`
/// evenly spaced colors.
///
/// Channels are interpolated linearly in `[0, 1]` and truncated to bytes.
/// Positions before the first anchor or after the last take the nearest
/// anchor's color.
pub fn linear_segmented(anchors: &[(f64, [f64; 4])], n: usize) -> Vec<Rgba> {
    let Some(&(_, first)) = anchors.first() else {
        return vec![TRANSPARENT; n];
    };
    let last_index = n.saturating_sub(1).max(1) as f64;

    (0..n)
        .map(|i| {
            let t = i as f64 / last_index;
            let upper = anchors.partition_point(|&(position, _)| position < t);
            let color = if upper == 0 {
                first
            } else if upper == anchors.len() {
                anchors[anchors.len() - 1].1
            } else {
                let (p0, c0) = anchors[upper - 1];
                let (p1, c1) = anchors[upper];
                let distance = if p1 > p0 { (t - p0) / (p1 - p0) } else { 1.0 };
                std::array::from_fn(|k| distance * (c1[k] - c0[k]) + c0[k])
            };
            color.map(|channel| (channel.clamp(0.0, 1.0) * 255.0) as u8)
        })
        .collect()
}

fn unit_color(color: Rgba) -> [f64; 4] {
    color.map(|channel| channel as f64 / 255.0)
}

// =============================================================================
// Custom colormaps
// =============================================================================

/// Parse a custom colormap: a JSON object of integer keys (0-255) to colors.
///
/// Any failure (bad JSON, bad key or bad color) is [`ColormapError::Malformed`].
pub fn parse_custom(raw: &str) -> Result<BTreeMap<u8, Rgba>, ColormapError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ColormapError::Malformed)?;
    let Value::Object(object) = value else {
        return Err(ColormapError::Malformed);
    };

    object
        .iter()
        .map(|(key, color)| -> Result<(u8, Rgba), ColormapError> {
            let key = key.trim().parse::<u8>().map_err(|_| ColormapError::Malformed)?;
            Ok((key, parse_color(color)?))
        })
        .collect()
}

/// Turn explicit anchors into a 256-entry ramp: key `k` sits at `k / 255`.
pub fn linear_ramp(entries: &BTreeMap<u8, Rgba>) -> Colormap {
    let anchors: Vec<(f64, [f64; 4])> = entries
        .iter()
        .map(|(&key, &color)| (key as f64 / 255.0, unit_color(color)))
        .collect();
    Colormap::from_ramp(&linear_segmented(&anchors, RAMP_SIZE))
}

/// Parse one color: a 3/4-element array of 0-255 integers or a hex string
/// (`#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`). Missing alpha is 255.
pub fn parse_color(value: &Value) -> Result<Rgba, ColormapError> {
    match value {
        Value::String(hex) => parse_hex(hex),
        Value::Array(items) if items.len() == 3 || items.len() == 4 => {
            let mut color = [0, 0, 0, 255];
            for (slot, item) in color.iter_mut().zip(items) {
                *slot = item
                    .as_u64()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or(ColormapError::Malformed)?;
            }
            Ok(color)
        }
        _ => Err(ColormapError::Malformed),
    }
}

fn parse_hex(hex: &str) -> Result<Rgba, ColormapError> {
    let digits = hex.strip_prefix('#').ok_or(ColormapError::Malformed)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColormapError::Malformed);
    }

    let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16);

    let parsed = match digits.len() {
        3 => [nibble(0), nibble(1), nibble(2), Ok(255)],
        4 => [nibble(0), nibble(1), nibble(2), nibble(3)],
        6 => [byte(0), byte(2), byte(4), Ok(255)],
        8 => [byte(0), byte(2), byte(4), byte(6)],
        _ => return Err(ColormapError::Malformed),
    };

    let mut color = [0u8; 4];
    for (slot, channel) in color.iter_mut().zip(parsed) {
        *slot = channel.map_err(|_| ColormapError::Malformed)?;
    }
    Ok(color)
}
