//! Named palettes and the request colormap resolver.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ColormapError;

use super::palette::{self, Colormap};

/// Name of the built-in colorblind-safe ramp.
pub const COLORBLIND: &str = "colorblind";

/// Name of the built-in binary palette.
pub const BINARY: &str = "nbinary";

/// How a custom colormap's entries are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColormapType {
    /// Entries are used as-is
    #[default]
    Explicit,

    /// Entries are anchors of a 256-entry interpolated ramp
    Linear,
}

impl FromStr for ColormapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "explicit" => Ok(ColormapType::Explicit),
            "linear" => Ok(ColormapType::Linear),
            other => Err(format!(
                "unknown colormap type '{other}' (expected 'explicit' or 'linear')"
            )),
        }
    }
}

impl fmt::Display for ColormapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColormapType::Explicit => f.write_str("explicit"),
            ColormapType::Linear => f.write_str("linear"),
        }
    }
}

/// Named palettes, immutable once built.
#[derive(Debug, Clone)]
pub struct ColormapRegistry {
    palettes: BTreeMap<String, Arc<Colormap>>,
}

impl ColormapRegistry {
    /// A registry holding the built-in palettes.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(COLORBLIND, palette::colorblind());
        registry.register(BINARY, palette::binary());
        registry
    }

    pub fn empty() -> Self {
        Self {
            palettes: BTreeMap::new(),
        }
    }

    /// Register (or replace) a named palette.
    pub fn register(&mut self, name: impl Into<String>, colormap: Colormap) {
        self.palettes.insert(name.into(), Arc::new(colormap));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Colormap>> {
        self.palettes.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.palettes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.palettes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// Resolve the colormap a request asks for.
    ///
    /// A palette name wins over a custom colormap when both are given.
    /// Neither (or only blank strings) resolves to `None`.
    ///
    /// # Errors
    ///
    /// - [`ColormapError::UnknownColormap`] for an unregistered name
    /// - [`ColormapError::Malformed`] for a custom colormap that does not parse
    pub fn resolve(
        &self,
        colormap_name: Option<&str>,
        colormap: Option<&str>,
        colormap_type: ColormapType,
    ) -> Result<Option<Arc<Colormap>>, ColormapError> {
        fn non_blank(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(name) = non_blank(colormap_name) {
            debug!(colormap = name, "Resolving named colormap");
            return self
                .get(name)
                .map(Some)
                .ok_or_else(|| ColormapError::UnknownColormap {
                    name: name.to_string(),
                });
        }

        let Some(raw) = non_blank(colormap) else {
            return Ok(None);
        };

        let entries = palette::parse_custom(raw)?;
        debug!(
            entries = entries.len(),
            colormap_type = %colormap_type,
            "Parsed custom colormap"
        );

        let colormap = match colormap_type {
            ColormapType::Explicit => Colormap::new(entries),
            ColormapType::Linear => palette::linear_ramp(&entries),
        };
        Ok(Some(Arc::new(colormap)))
    }
}

impl Default for ColormapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
