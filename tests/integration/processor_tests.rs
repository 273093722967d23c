//! Tile processor integration tests.
//!
//! Tests verify:
//! - PNG layout for single-band and three-band output
//! - The byte conversion used when no algorithm is requested
//! - Error type and status mapping at the request boundary

use image::ColorType;
use ndarray::Array3;

use tiler_postprocess::raster::{Affine, RasterTile};
use tiler_postprocess::{ErrorResponse, ProcessError, ProcessRequest};

use super::test_utils::{buffered_tile, decode_png, default_processor};

fn tile(data: Array3<f64>) -> RasterTile {
    let height = data.dim().1 as f64;
    RasterTile::new(data, Affine::from_origin(0.0, height, 1.0, 1.0), "EPSG:3857")
}

async fn process_err(tile: &RasterTile, request: ProcessRequest) -> ProcessError {
    default_processor()
        .process(tile, &request)
        .await
        .expect_err("request should fail")
}

// =============================================================================
// Output Layout
// =============================================================================

#[tokio::test]
async fn test_single_band_png_has_alpha_from_mask() {
    let data = Array3::from_shape_vec((1, 2, 2), vec![-1.0, 0.0, 1.0, f64::NAN]).unwrap();
    let request = ProcessRequest::new().with_algorithm("masked-rescale", None);

    let processed = default_processor()
        .process(&tile(data), &request)
        .await
        .unwrap();
    assert!(!processed.colormap_applied);

    let image = decode_png(&processed.data);
    assert_eq!(image.color(), ColorType::La8);
    let image = image.to_luma_alpha8();
    assert_eq!(image.get_pixel(0, 0).0, [0, 255]);
    assert_eq!(image.get_pixel(1, 0).0, [127, 255]);
    assert_eq!(image.get_pixel(0, 1).0, [255, 255]);
    assert_eq!(image.get_pixel(1, 1).0, [0, 0]);
}

#[tokio::test]
async fn test_three_band_png_without_algorithm() {
    let mut data = Array3::from_elem((3, 2, 2), 0.0);
    data.index_axis_mut(ndarray::Axis(0), 0).fill(10.0);
    data.index_axis_mut(ndarray::Axis(0), 1).fill(20.0);
    data.index_axis_mut(ndarray::Axis(0), 2).fill(30.0);
    data[[0, 1, 0]] = f64::NAN;

    let processed = default_processor()
        .process(&tile(data), &ProcessRequest::new())
        .await
        .unwrap();

    let image = decode_png(&processed.data);
    assert_eq!(image.color(), ColorType::Rgba8);
    let image = image.to_rgba8();
    assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, 255]);
    assert_eq!(image.get_pixel(0, 1).0, [0, 0, 0, 0]);
}

#[tokio::test]
async fn test_no_algorithm_saturates_to_bytes() {
    let data = Array3::from_shape_vec((1, 1, 4), vec![-5.0, 12.7, 300.0, f64::NAN]).unwrap();

    let processed = default_processor()
        .process(&tile(data), &ProcessRequest::new())
        .await
        .unwrap();

    assert_eq!(processed.tile.data().as_slice().unwrap(), &[0, 12, 255, 0]);
    assert_eq!(processed.tile.mask().as_slice().unwrap(), &[0, 0, 0, 255]);
}

#[tokio::test]
async fn test_blank_params_use_defaults() {
    let data = Array3::from_shape_vec((1, 1, 2), vec![-1.0, 1.0]).unwrap();
    let request = ProcessRequest::new().with_algorithm("masked-rescale", Some("  "));

    let processed = default_processor()
        .process(&tile(data), &request)
        .await
        .unwrap();
    assert_eq!(processed.tile.data().as_slice().unwrap(), &[0, 255]);
}

#[tokio::test]
async fn test_custom_rescale_range() {
    let data = Array3::from_shape_vec((1, 1, 4), vec![0.0, 50.0, 100.0, 150.0]).unwrap();
    let request =
        ProcessRequest::new().with_algorithm("masked-rescale", Some(r#"{"min": 0, "max": 100}"#));

    let processed = default_processor()
        .process(&tile(data), &request)
        .await
        .unwrap();
    assert_eq!(processed.tile.data().as_slice().unwrap(), &[0, 127, 255, 255]);
}

#[tokio::test]
async fn test_heatmap_png_is_tile_sized() {
    let request = ProcessRequest::new()
        .with_algorithm("stravaheatmap", Some(r#"{"buffer": 16, "tilesize": 32}"#));

    let processed = default_processor()
        .process(&buffered_tile(64), &request)
        .await
        .unwrap();

    let image = decode_png(&processed.data);
    assert_eq!((image.width(), image.height()), (32, 32));
}

// =============================================================================
// Error Mapping
// =============================================================================

#[tokio::test]
async fn test_unknown_algorithm() {
    let err = process_err(
        &buffered_tile(4),
        ProcessRequest::new().with_algorithm("hillshade", None),
    )
    .await;

    let response = ErrorResponse::from(&err);
    assert_eq!(response.status, 400);
    assert_eq!(response.error, "unknown_algorithm");
    assert!(response.message.contains("hillshade"));
}

#[tokio::test]
async fn test_invalid_parameters() {
    let cases = [
        ("masked-rescale", r#"{"min": 1, "max": 1}"#),
        ("masked-rescale", r#"{"min": "low"}"#),
        ("masked-rescale", "{not json"),
        ("stravaclahe", r#"{"tilesize": 0}"#),
        ("bboxstats", r#"{"scale": 7}"#),
        ("bboxstats", r#"{"bbox": [10, 0, 0, 10]}"#),
        ("bboxstats", r#"[0, 0, 1, 1]"#),
    ];

    for (name, params) in cases {
        let err = process_err(
            &buffered_tile(4),
            ProcessRequest::new().with_algorithm(name, Some(params)),
        )
        .await;
        let response = ErrorResponse::from(&err);
        assert_eq!(response.status, 400, "{name} {params}");
        assert_eq!(response.error, "invalid_parameters", "{name} {params}");
    }
}

#[tokio::test]
async fn test_buffer_violation_is_server_error() {
    let err = process_err(
        &buffered_tile(100),
        ProcessRequest::new().with_algorithm("stravaclahe", None),
    )
    .await;

    assert!(!err.is_bad_request());
    let response = ErrorResponse::from(&err);
    assert_eq!(response.status, 500);
    assert_eq!(response.error, "buffer_too_small");
}

#[tokio::test]
async fn test_empty_tile_is_server_error() {
    let err = process_err(
        &tile(Array3::zeros((0, 4, 4))),
        ProcessRequest::new().with_algorithm("masked-rescale", None),
    )
    .await;

    let response = ErrorResponse::from(&err);
    assert_eq!(response.status, 500);
    assert_eq!(response.error, "empty_tile");
}

#[tokio::test]
async fn test_missing_dataset_statistics() {
    let err = process_err(
        &buffered_tile(4),
        ProcessRequest::new().with_algorithm("bboxstats", Some(r#"{"bbox": [0, 0, 1, 1]}"#)),
    )
    .await;

    let response = ErrorResponse::from(&err);
    assert_eq!(response.status, 500);
    assert_eq!(response.error, "missing_statistics");
}
