//! Configuration management for the tile post-processing layer.
//!
//! This module provides:
//! - Command-line arguments and subcommands via clap
//! - Environment variables with `TILER_` prefix
//! - Defaults for every setting
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use tiler_postprocess::config::Cli;
//!
//! let cli = Cli::parse();
//! cli.config.validate()?;
//! println!("bbox scale threshold: {}", cli.config.bbox_scale);
//! ```
//!
//! # Environment Variables
//!
//! - `TILER_BBOX_SCALE` - Scale above which `bboxstats` uses bbox statistics (default: 6)
//! - `TILER_BBOX_CACHE_TIMEOUT` - Bbox statistics cache TTL in seconds (default: 60)
//! - `TILER_STATS_CACHE_ENTRIES` - Max cached bbox statistics entries (default: 10000)

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::algorithm::{AlgorithmContext, AlgorithmRegistry, DEFAULT_BBOX_SCALE};
use crate::colormap::ColormapType;
use crate::raster::RasterSource;
use crate::stats::{StatsCache, SystemClock, DEFAULT_STATS_CACHE_ENTRIES, DEFAULT_STATS_TTL};

// =============================================================================
// CLI
// =============================================================================

/// Tile post-processing: rescale, equalize and colorize raster tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiler-postprocess")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List registered algorithms and their parameters.
    Algorithms(AlgorithmsArgs),

    /// Resolve a named or custom colormap and print it as JSON.
    Colormap(ColormapArgs),

    /// Validate configuration and build the registries.
    Check,
}

#[derive(Args, Debug, Clone)]
pub struct AlgorithmsArgs {
    /// Only describe this algorithm.
    pub name: Option<String>,

    /// Print JSON instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ColormapArgs {
    /// Registered palette name (takes precedence over --colormap).
    #[arg(long)]
    pub name: Option<String>,

    /// JSON-encoded custom colormap, e.g. '{"0": "#000000", "255": [255, 255, 255]}'.
    #[arg(long)]
    pub colormap: Option<String>,

    /// How a custom colormap is applied: explicit or linear.
    #[arg(long, default_value_t = ColormapType::Explicit)]
    pub colormap_type: ColormapType,
}

// =============================================================================
// Shared Configuration
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Scale above which `bboxstats` rescales by bounding-box statistics.
    #[arg(long, global = true, default_value_t = DEFAULT_BBOX_SCALE, env = "TILER_BBOX_SCALE")]
    pub bbox_scale: u32,

    /// Lifetime of cached bounding-box statistics, in seconds.
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_STATS_TTL.as_secs(),
        env = "TILER_BBOX_CACHE_TIMEOUT"
    )]
    pub bbox_cache_timeout: u64,

    /// Maximum number of cached bounding-box statistics entries.
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_STATS_CACHE_ENTRIES,
        env = "TILER_STATS_CACHE_ENTRIES"
    )]
    pub stats_cache_entries: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bbox_scale: DEFAULT_BBOX_SCALE,
            bbox_cache_timeout: DEFAULT_STATS_TTL.as_secs(),
            stats_cache_entries: DEFAULT_STATS_CACHE_ENTRIES,
            verbose: false,
        }
    }
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.bbox_cache_timeout == 0 {
            return Err("bbox_cache_timeout must be greater than 0".to_string());
        }
        if self.stats_cache_entries == 0 {
            return Err("stats_cache_entries must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.bbox_cache_timeout)
    }

    /// Build the bounding-box statistics cache over `source`.
    pub fn stats_cache(&self, source: Arc<dyn RasterSource>) -> StatsCache {
        StatsCache::with_options(
            source,
            Arc::new(SystemClock),
            self.stats_ttl(),
            self.stats_cache_entries,
        )
    }

    /// Build the algorithm registry, sharing one statistics cache over `source`.
    pub fn algorithm_registry(&self, source: Arc<dyn RasterSource>) -> AlgorithmRegistry {
        let cache = Arc::new(self.stats_cache(source));
        AlgorithmRegistry::new(AlgorithmContext::new(cache).with_bbox_scale(self.bbox_scale))
    }
}

// =============================================================================
// Tests
// =============================================================================
