//! Tiler post-processing CLI.
//!
//! Inspects the algorithm and colormap registries and validates configuration.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ndarray::Array3;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiler_postprocess::{
    config::{AlgorithmsArgs, Cli, ColormapArgs, Command, Config},
    Affine, AlgorithmInfo, AlgorithmRegistry, ColormapRegistry, MemoryRasterSource, ProcessRequest,
    RasterTile, TileProcessor,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.config.verbose);

    if let Err(e) = cli.config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Algorithms(args) => run_algorithms(&cli.config, args),
        Command::Colormap(args) => run_colormap(args),
        Command::Check => run_check(&cli.config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiler_postprocess=debug"
    } else {
        "tiler_postprocess=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The registries only need a raster source for `bboxstats`; the CLI never
/// reads rasters, so an empty in-memory one is enough.
fn algorithm_registry(config: &Config) -> AlgorithmRegistry {
    config.algorithm_registry(Arc::new(MemoryRasterSource::new()))
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize output: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Algorithms Command
// =============================================================================

fn run_algorithms(config: &Config, args: AlgorithmsArgs) -> ExitCode {
    let registry = algorithm_registry(config);

    let infos: Vec<&AlgorithmInfo> = match args.name.as_deref() {
        Some(name) => match registry.info(name) {
            Some(info) => vec![info],
            None => {
                error!("Unknown algorithm: {}", name);
                return ExitCode::FAILURE;
            }
        },
        None => registry.list().collect(),
    };

    if args.json {
        return print_json(&infos);
    }

    for info in infos {
        println!("{:<16} {}", info.name, info.title);
        println!(
            "{:<16} bands {} -> {} ({})",
            "", info.input_nbands, info.output_nbands, info.output_dtype
        );
        if let Some(params) = info.parameters.as_object() {
            for (name, schema) in params {
                println!("{:<16}   {}: {}", "", name, schema);
            }
        }
        println!();
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Colormap Command
// =============================================================================

fn run_colormap(args: ColormapArgs) -> ExitCode {
    let registry = ColormapRegistry::new();

    match registry.resolve(
        args.name.as_deref(),
        args.colormap.as_deref(),
        args.colormap_type,
    ) {
        Ok(Some(colormap)) => print_json(colormap.as_ref()),
        Ok(None) => {
            println!("null");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{} (status {})", e, e.status_code());
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: &Config) -> ExitCode {
    println!("Tiler Post-processing Configuration Check");
    println!("═════════════════════════════════════════");
    println!();
    println!("✓ bbox scale threshold: {}", config.bbox_scale);
    println!("✓ bbox cache timeout: {}s", config.bbox_cache_timeout);
    println!("✓ stats cache entries: {}", config.stats_cache_entries);
    println!();

    let algorithms = algorithm_registry(config);
    let colormaps = ColormapRegistry::new();
    println!(
        "✓ Algorithms: {}",
        algorithms.names().collect::<Vec<_>>().join(", ")
    );
    println!(
        "✓ Colormaps: {}",
        colormaps.names().collect::<Vec<_>>().join(", ")
    );

    let processor = TileProcessor::new(algorithms, colormaps);
    let tile = RasterTile::new(
        Array3::from_shape_fn((1, 16, 16), |(_, r, c)| (r * 16 + c) as f64 / 255.0 * 2.0 - 1.0),
        Affine::from_origin(0.0, 16.0, 1.0, 1.0),
        "EPSG:3857",
    );
    let request = ProcessRequest::new()
        .with_algorithm("masked-rescale", None)
        .with_colormap_name("colorblind");

    match processor.process(&tile, &request).await {
        Ok(processed) => {
            println!("✓ Pipeline: encoded {} byte PNG", processed.data.len());
            info!("Configuration check passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("✗ Pipeline: {}", e);
            ExitCode::FAILURE
        }
    }
}
