//! Name-keyed algorithm registry.
//!
//! Each entry pairs an [`AlgorithmInfo`] with a builder that parses request
//! parameters and constructs a fresh [`Algorithm`]. Builders capture the
//! shared services an algorithm needs (the statistics cache, the bbox scale
//! threshold), so callers only deal in names and JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::AlgorithmError;
use crate::stats::StatsCache;

use super::bbox::{BBoxStats, BBoxStatsParams, DEFAULT_BBOX_SCALE};
use super::buffered::{BufferParams, StravaClahe, StravaHeatmap};
use super::rescale::{MaskedRescale, MaskedRescaleParams};
use super::{Algorithm, AlgorithmInfo};

/// Constructs an algorithm from its parsed JSON parameters.
pub type AlgorithmBuilder =
    Box<dyn Fn(Value) -> Result<Box<dyn Algorithm>, AlgorithmError> + Send + Sync>;

/// Shared services handed to algorithm builders.
#[derive(Clone)]
pub struct AlgorithmContext {
    /// Cache for bounding-box statistics
    pub stats_cache: Arc<StatsCache>,

    /// Scale above which `bboxstats` reads bbox statistics
    pub bbox_scale: u32,
}

impl AlgorithmContext {
    pub fn new(stats_cache: Arc<StatsCache>) -> Self {
        Self {
            stats_cache,
            bbox_scale: DEFAULT_BBOX_SCALE,
        }
    }

    pub fn with_bbox_scale(mut self, bbox_scale: u32) -> Self {
        self.bbox_scale = bbox_scale;
        self
    }
}

struct Entry {
    info: AlgorithmInfo,
    build: AlgorithmBuilder,
}

/// Registry of algorithms available to tile requests.
pub struct AlgorithmRegistry {
    entries: BTreeMap<String, Entry>,
}

impl AlgorithmRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// A registry with the built-in algorithms.
    pub fn new(context: AlgorithmContext) -> Self {
        let mut registry = Self::empty();

        registry.register(MaskedRescale::info(), |params| {
            let params: MaskedRescaleParams = parse_params(MaskedRescale::NAME, params)?;
            Ok(Box::new(MaskedRescale::new(params)?))
        });

        registry.register(StravaHeatmap::info(), |params| {
            let params: BufferParams = parse_params(StravaHeatmap::NAME, params)?;
            Ok(Box::new(StravaHeatmap::new(params)?))
        });

        registry.register(StravaClahe::info(), |params| {
            let params: BufferParams = parse_params(StravaClahe::NAME, params)?;
            Ok(Box::new(StravaClahe::new(params)?))
        });

        registry.register(BBoxStats::info(), move |params| {
            let params: BBoxStatsParams = parse_params(BBoxStats::NAME, params)?;
            Ok(Box::new(BBoxStats::new(
                params,
                context.bbox_scale,
                context.stats_cache.clone(),
            )?))
        });

        registry
    }

    /// Register (or replace) an algorithm under `info.name`.
    pub fn register<F>(&mut self, info: AlgorithmInfo, build: F)
    where
        F: Fn(Value) -> Result<Box<dyn Algorithm>, AlgorithmError> + Send + Sync + 'static,
    {
        self.entries.insert(
            info.name.clone(),
            Entry {
                info,
                build: Box::new(build),
            },
        );
    }

    /// Construct `name` from a JSON parameter string.
    ///
    /// `None` or a blank string means "all defaults".
    ///
    /// # Errors
    ///
    /// - [`AlgorithmError::UnknownAlgorithm`] if nothing is registered as `name`
    /// - [`AlgorithmError::InvalidParameters`] if the parameters do not parse
    ///   or fail validation
    pub fn create(
        &self,
        name: &str,
        params: Option<&str>,
    ) -> Result<Box<dyn Algorithm>, AlgorithmError> {
        let value = match params.map(str::trim) {
            None | Some("") => Value::Object(Default::default()),
            Some(raw) => {
                serde_json::from_str(raw).map_err(|e| AlgorithmError::InvalidParameters {
                    algorithm: name.to_string(),
                    message: e.to_string(),
                })?
            }
        };
        self.create_from_value(name, value)
    }

    /// Construct `name` from already-parsed JSON parameters.
    pub fn create_from_value(
        &self,
        name: &str,
        params: Value,
    ) -> Result<Box<dyn Algorithm>, AlgorithmError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| AlgorithmError::UnknownAlgorithm {
                name: name.to_string(),
            })?;

        let params = match params {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => params,
            other => {
                return Err(AlgorithmError::InvalidParameters {
                    algorithm: name.to_string(),
                    message: format!("expected a JSON object, got {other}"),
                })
            }
        };

        debug!(algorithm = name, params = %params, "Creating algorithm");
        (entry.build)(params)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn info(&self, name: &str) -> Option<&AlgorithmInfo> {
        self.entries.get(name).map(|entry| &entry.info)
    }

    /// Registered algorithms, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &AlgorithmInfo> {
        self.entries.values().map(|entry| &entry.info)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_params<T: DeserializeOwned>(algorithm: &str, params: Value) -> Result<T, AlgorithmError> {
    serde_json::from_value(params).map_err(|e| AlgorithmError::InvalidParameters {
        algorithm: algorithm.to_string(),
        message: e.to_string(),
    })
}
