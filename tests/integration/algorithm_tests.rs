//! Algorithm integration tests.
//!
//! Tests verify:
//! - Buffered algorithms crop to the central window and report its bounds
//! - Multi-band CLAHE output keeps data and mask aligned
//! - Parameters flow from JSON through the registry

use std::sync::Arc;

use ndarray::Array3;

use tiler_postprocess::algorithm::{BufferParams, StravaClahe, StravaHeatmap};
use tiler_postprocess::raster::{Affine, BoundingBox, RasterTile, Window};
use tiler_postprocess::stats::ManualClock;
use tiler_postprocess::{Algorithm, AlgorithmContext, AlgorithmError, AlgorithmRegistry};

use super::test_utils::{buffered_tile, stats_cache, TrackingSource};

fn registry() -> AlgorithmRegistry {
    let cache = stats_cache(TrackingSource::new(), Arc::new(ManualClock::new()));
    AlgorithmRegistry::new(AlgorithmContext::new(cache))
}

/// Bounds of the 256x256 window at offset 512 of [`buffered_tile`].
fn central_bounds() -> BoundingBox {
    BoundingBox::new(6120.0, 12320.0, 8680.0, 14880.0)
}

// =============================================================================
// Strava Heatmap
// =============================================================================

#[tokio::test]
async fn test_heatmap_full_size_request() {
    let tile = buffered_tile(1280);
    let algorithm = registry().create("stravaheatmap", None).unwrap();

    let out = algorithm.apply(&tile).await.unwrap();

    assert_eq!(out.data().dim(), (1, 256, 256));
    assert_eq!(out.mask().dim(), (1, 256, 256));
    assert_eq!(*out.bounds(), central_bounds());
    assert_ne!(out.bounds(), tile.bounds());
    assert_eq!(out.transform().c, 6120.0);
    assert_eq!(out.transform().f, 14880.0);
    assert_eq!(out.crs(), "EPSG:3857");

    let min = out.data().iter().copied().min().unwrap();
    let max = out.data().iter().copied().max().unwrap();
    assert!(max > min, "equalized output should not be flat");
    assert!(out.mask().iter().all(|&m| m == 0));
}

#[tokio::test]
async fn test_heatmap_equalizes_over_buffer() {
    // The window alone holds one value, but the buffer around it holds
    // others, so the crop is not flattened to zero.
    let mut data = Array3::from_elem((1, 12, 12), 0.0);
    for r in 4..8 {
        for c in 4..8 {
            data[[0, r, c]] = 50.0;
        }
    }
    data[[0, 0, 0]] = 100.0;
    let tile = RasterTile::new(data, Affine::from_origin(0.0, 12.0, 1.0, 1.0), "EPSG:3857");

    let params = BufferParams {
        buffer: 4,
        tilesize: 4,
    };
    let out = StravaHeatmap::new(params).unwrap().apply(&tile).await.unwrap();

    assert_eq!(out.data().dim(), (1, 4, 4));
    let first = out.data()[[0, 0, 0]];
    assert!(first > 0 && first < 255);
    assert!(out.data().iter().all(|&v| v == first));
}

#[tokio::test]
async fn test_bounds_follow_unbuffered_window() {
    for buffer in [0usize, 1, 5] {
        for tilesize in [1usize, 4, 8] {
            let size = buffer * 2 + tilesize;
            let tile = buffered_tile(size);
            let expected = tile
                .transform()
                .window_bounds(&Window::centered(buffer, tilesize));
            let params = BufferParams { buffer, tilesize };

            let heatmap = StravaHeatmap::new(params).unwrap().apply(&tile).await.unwrap();
            assert_eq!(*heatmap.bounds(), expected, "heatmap {buffer}/{tilesize}");
            assert_eq!(heatmap.data().dim(), (1, tilesize, tilesize));

            let clahe = StravaClahe::new(params).unwrap().apply(&tile).await.unwrap();
            assert_eq!(*clahe.bounds(), expected, "clahe {buffer}/{tilesize}");
            assert_eq!(clahe.data().dim(), (1, tilesize, tilesize));
        }
    }
}

#[tokio::test]
async fn test_undersized_tile_is_rejected() {
    let algorithm = registry().create("stravaheatmap", None).unwrap();
    let err = algorithm.apply(&buffered_tile(256)).await.unwrap_err();

    assert!(matches!(
        err,
        AlgorithmError::BufferTooSmall {
            required: 1280,
            height: 256,
            width: 256
        }
    ));
    assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Strava CLAHE
// =============================================================================

#[tokio::test]
async fn test_clahe_full_size_request() {
    let mut tile_data = buffered_tile(1280).data().clone();
    tile_data[[0, 600, 700]] = f64::NAN;
    let tile = RasterTile::new(
        tile_data,
        Affine::from_origin(1000.0, 20000.0, 10.0, 10.0),
        "EPSG:3857",
    );

    let algorithm = registry()
        .create("stravaclahe", Some(r#"{"buffer": 512, "tilesize": 256}"#))
        .unwrap();
    let out = algorithm.apply(&tile).await.unwrap();

    assert_eq!(out.data().dim(), (1, 256, 256));
    assert_eq!(*out.bounds(), central_bounds());
    assert_eq!(out.mask()[[0, 88, 188]], 255);
    assert_eq!(out.data()[[0, 88, 188]], 0);
    assert_eq!(out.mask().iter().filter(|&&m| m == 255).count(), 1);
}

#[tokio::test]
async fn test_clahe_mask_from_original_data() {
    // A band whose no-data sits where the normalized value would be 0 anyway
    // still gets masked, while a genuine 0 sample stays valid.
    let mut data = Array3::from_shape_fn((2, 10, 10), |(_, r, c)| (r * 10 + c) as f64);
    data[[0, 5, 5]] = f64::NAN;
    let tile = RasterTile::new(data, Affine::from_origin(0.0, 10.0, 1.0, 1.0), "EPSG:3857");

    let params = BufferParams {
        buffer: 3,
        tilesize: 4,
    };
    let out = StravaClahe::new(params).unwrap().apply(&tile).await.unwrap();

    assert_eq!(out.data().dim(), (2, 4, 4));
    assert_eq!(out.mask().dim(), (2, 4, 4));
    for band in 0..2 {
        assert_eq!(out.mask()[[band, 2, 2]], 255);
        assert_eq!(out.data()[[band, 2, 2]], 0);
        assert_eq!(out.mask()[[band, 0, 0]], 0);
    }
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registry_metadata() {
    let registry = registry();
    for info in registry.list() {
        assert_eq!(info.input_nbands, 1);
        assert_eq!(info.output_nbands, 1);
        assert!(info.parameters.is_object());
    }
    assert!(registry.info("bboxstats").unwrap().parameters["bbox"].is_object());
}

#[test]
fn test_registry_rejects_unknown_fields() {
    let err = registry()
        .create("stravaheatmap", Some(r#"{"buffer": 8, "tile_size": 4}"#))
        .unwrap_err();
    assert!(matches!(err, AlgorithmError::InvalidParameters { .. }));
    assert!(err.to_string().contains("stravaheatmap"));
}
